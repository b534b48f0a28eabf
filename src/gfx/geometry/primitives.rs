//! # Primitive Shape Generation
//!
//! This module contains functions to generate the built-in model shapes.
//! All shapes are centered at the origin with a unit footprint and carry
//! normals and texture coordinates.

use super::MeshData;
use std::f32::consts::PI;

/// Generate a unit plane on the XZ plane facing +Y
///
/// Vertices span -0.5 to 0.5 on X and Z; texture coordinates cover the
/// unit square once.
pub fn generate_plane() -> MeshData {
    let mut data = MeshData::new();

    let corners = [
        ([-0.5, 0.0, 0.5], [0.0, 0.0]),
        ([0.5, 0.0, 0.5], [1.0, 0.0]),
        ([0.5, 0.0, -0.5], [1.0, 1.0]),
        ([-0.5, 0.0, -0.5], [0.0, 1.0]),
    ];
    for (position, tex_coord) in corners {
        data.push_vertex(position, [0.0, 1.0, 0.0], tex_coord);
    }

    data.push_triangle(0, 1, 2);
    data.push_triangle(0, 2, 3);

    data
}

/// Generate a unit cube centered at the origin
///
/// Returns a cube with vertices from -0.5 to 0.5 on all axes. Faces do not
/// share vertices: each face has its own flat outward normal and a full
/// [0, 1] texture square, so every face lights and maps independently.
pub fn generate_cube() -> MeshData {
    let mut data = MeshData::new();

    // (normal, four corners counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        // Front
        (
            [0.0, 0.0, 1.0],
            [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]],
        ),
        // Back
        (
            [0.0, 0.0, -1.0],
            [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]],
        ),
        // Top
        (
            [0.0, 1.0, 0.0],
            [[-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]],
        ),
        // Bottom
        (
            [0.0, -1.0, 0.0],
            [[0.5, -0.5, 0.5], [-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5]],
        ),
        // Right
        (
            [1.0, 0.0, 0.0],
            [[0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5]],
        ),
        // Left
        (
            [-1.0, 0.0, 0.0],
            [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]],
        ),
    ];
    let face_tex_coords = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    for (normal, corners) in faces {
        let first = data.vertex_count() as u16;
        for (corner, tex_coord) in corners.into_iter().zip(face_tex_coords) {
            data.push_vertex(corner, normal, tex_coord);
        }
        data.push_triangle(first, first + 1, first + 2);
        data.push_triangle(first, first + 2, first + 3);
    }

    data
}

/// Largest sphere division count; 255 x 255 vertices still fit 16-bit indices
pub const MAX_SPHERE_DIVISIONS: u16 = 254;

/// Generate a UV sphere with specified resolution
///
/// # Arguments
/// * `slices` - Number of longitude divisions
/// * `stacks` - Number of latitude divisions
///
/// Returns a sphere of radius 0.5 centered at the origin with
/// `(slices + 1) * (stacks + 1)` vertices. The last column of vertices
/// duplicates the first so the texture seam closes. Both counts are clamped
/// to [`MAX_SPHERE_DIVISIONS`].
pub fn generate_sphere(slices: u16, stacks: u16) -> MeshData {
    let mut data = MeshData::new();

    let slices = slices.clamp(3, MAX_SPHERE_DIVISIONS);
    let stacks = stacks.clamp(2, MAX_SPHERE_DIVISIONS);
    let delta_phi = 2.0 * PI / slices as f32;
    let delta_theta = -PI / stacks as f32;

    for i in 0..=slices {
        let phi = i as f32 * delta_phi;
        let (sin_phi, cos_phi) = phi.sin_cos();

        for j in 0..=stacks {
            // From the north pole (pi/2) down to the south pole (-pi/2)
            let theta = PI / 2.0 + j as f32 * delta_theta;
            let (sin_theta, cos_theta) = theta.sin_cos();

            let direction = [cos_theta * cos_phi, sin_theta, -cos_theta * sin_phi];
            let position = direction.map(|c| c * 0.5);
            let tex_coord = [
                i as f32 / slices as f32,
                1.0 - j as f32 / stacks as f32,
            ];
            data.push_vertex(position, direction, tex_coord);
        }
    }

    for i in 0..slices {
        let mut k1 = i * (stacks + 1);
        let mut k2 = (i + 1) * (stacks + 1);
        for _ in 0..stacks {
            data.push_triangle(k1, k1 + 1, k2);
            data.push_triangle(k1 + 1, k2 + 1, k2);
            k1 += 1;
            k2 += 1;
        }
    }

    data
}

/// Generate a flat hexagon as a fan of six triangles
///
/// # Arguments
/// * `radius` - Distance from the center to each rim vertex
/// * `center` - Position of the fan's hub vertex
/// * `flip_normal` - Face -Y instead of +Y
///
/// Rim vertices sit at 30°, 90°, ..., 330° around the hub in the XZ plane.
pub fn generate_hexagon(radius: f32, center: [f32; 3], flip_normal: bool) -> MeshData {
    let mut data = MeshData::new();

    let normal = if flip_normal {
        [0.0, -1.0, 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };

    let mut positions = vec![center];
    for step in 0..6 {
        let angle = ((30 + step * 60) as f32).to_radians();
        let (sin, cos) = angle.sin_cos();
        positions.push([center[0] + radius * cos, center[1], center[2] + radius * sin]);
    }

    let tex_coords = planar_tex_coords(&positions, 1);
    for (position, tex_coord) in positions.into_iter().zip(tex_coords) {
        data.push_vertex(position, normal, tex_coord);
    }

    for i in 1..=6u16 {
        let next = if i == 6 { 1 } else { i + 1 };
        data.push_triangle(0, i, next);
    }

    data
}

/// Projects positions onto texture space along one axis
///
/// Each component is mapped with `v * 2 + 1` and the component on
/// `drop_axis` (the flat face's normal axis) is discarded.
pub fn planar_tex_coords(positions: &[[f32; 3]], drop_axis: usize) -> Vec<[f32; 2]> {
    positions
        .iter()
        .map(|position| {
            let mut kept = position
                .iter()
                .enumerate()
                .filter(|(axis, _)| *axis != drop_axis)
                .map(|(_, value)| value * 2.0 + 1.0);
            [kept.next().unwrap_or(0.0), kept.next().unwrap_or(0.0)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn length(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    fn all_shapes() -> Vec<(&'static str, MeshData)> {
        vec![
            ("plane", generate_plane()),
            ("cube", generate_cube()),
            ("sphere", generate_sphere(36, 18)),
            ("hexagon", generate_hexagon(0.5, [0.0; 3], false)),
        ]
    }

    #[test]
    fn every_shape_has_whole_triangles_and_no_dangling_indices() {
        for (name, mesh) in all_shapes() {
            assert!(mesh.index_count() > 0, "{name} has no indices");
            assert_eq!(mesh.index_count() % 3, 0, "{name}");
            let max = mesh.max_index().unwrap() as usize;
            assert!(max < mesh.vertex_count(), "{name} index {max} dangles");
            assert!(mesh.is_consistent(), "{name} streams disagree");
        }
    }

    #[test]
    fn plane_is_a_single_upward_quad() {
        let plane = generate_plane();
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.triangle_count(), 2);
        assert!(plane.normals.iter().all(|n| n.0 == [0.0, 1.0, 0.0]));
        assert!(plane.positions.iter().all(|p| p.0[1] == 0.0));
    }

    #[test]
    fn cube_faces_have_axis_normals() {
        let cube = generate_cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);

        let axes = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        for normal in &cube.normals {
            assert!(axes.contains(&normal.0), "{:?} is not an axis", normal);
        }
        for axis in axes {
            let count = cube.normals.iter().filter(|n| n.0 == axis).count();
            assert_eq!(count, 4, "face {:?}", axis);
        }
    }

    #[test]
    fn cube_face_vertices_lie_on_their_face() {
        let cube = generate_cube();
        for (position, normal) in cube.positions.iter().zip(&cube.normals) {
            let along: f32 = (0..3).map(|i| position.0[i] * normal.0[i]).sum();
            assert_abs_diff_eq!(along, 0.5);
        }
    }

    #[test]
    fn sphere_counts_match_the_tessellation() {
        let sphere = generate_sphere(36, 18);
        assert_eq!(sphere.vertex_count(), 37 * 19);
        assert_eq!(sphere.vertex_count(), 703);
        assert_eq!(sphere.triangle_count(), 1296);
    }

    #[test]
    fn sphere_normals_are_unit_and_radius_is_half() {
        let sphere = generate_sphere(36, 18);
        for (position, normal) in sphere.positions.iter().zip(&sphere.normals) {
            assert_abs_diff_eq!(length(normal.0), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(length(position.0), 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn sphere_starts_at_the_north_pole_and_seam_repeats() {
        let (slices, stacks) = (8u16, 4u16);
        let sphere = generate_sphere(slices, stacks);
        assert_abs_diff_eq!(sphere.positions[0].0[1], 0.5, epsilon = 1e-6);
        assert_eq!(sphere.tex_coords[0].0, [0.0, 1.0]);

        let last_column = (slices * (stacks + 1)) as usize;
        for j in 0..=stacks as usize {
            let first = sphere.positions[j].0;
            let seam = sphere.positions[last_column + j].0;
            for axis in 0..3 {
                assert_abs_diff_eq!(first[axis], seam[axis], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn oversized_sphere_is_clamped_to_16_bit_indices() {
        let sphere = generate_sphere(300, 300);
        let side = MAX_SPHERE_DIVISIONS as usize + 1;
        assert_eq!(sphere.vertex_count(), side * side);
        assert!(sphere.is_consistent());
        let max_index = sphere.triangles.iter().flat_map(|t| t.0).max().unwrap();
        assert_eq!(max_index as usize, side * side - 1);
    }

    #[test]
    fn sphere_first_quad_uses_the_column_pattern() {
        let stacks = 18u16;
        let sphere = generate_sphere(36, stacks);
        let k2 = stacks + 1;
        assert_eq!(sphere.triangles[0].0, [0, 1, k2]);
        assert_eq!(sphere.triangles[1].0, [1, k2 + 1, k2]);
    }

    #[test]
    fn hexagon_is_a_seven_vertex_fan() {
        let radius = 0.75;
        let hexagon = generate_hexagon(radius, [0.0; 3], false);
        assert_eq!(hexagon.vertex_count(), 7);
        assert_eq!(hexagon.triangle_count(), 6);
        assert_eq!(hexagon.positions[0].0, [0.0, 0.0, 0.0]);

        for rim in &hexagon.positions[1..] {
            assert_abs_diff_eq!(length(rim.0), radius, epsilon = 1e-5);
            assert_eq!(rim.0[1], 0.0);
        }
        assert_eq!(hexagon.triangles[5].0, [0, 6, 1]);
        assert!(hexagon.triangles.iter().all(|t| t.0[0] == 0));
    }

    #[test]
    fn hexagon_rim_starts_at_thirty_degrees() {
        let hexagon = generate_hexagon(1.0, [0.0; 3], false);
        let first = hexagon.positions[1].0;
        assert_abs_diff_eq!(first[0], 30f32.to_radians().cos(), epsilon = 1e-6);
        assert_abs_diff_eq!(first[2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn hexagon_normal_flips() {
        let up = generate_hexagon(0.5, [0.0; 3], false);
        let down = generate_hexagon(0.5, [0.0; 3], true);
        assert!(up.normals.iter().all(|n| n.0 == [0.0, 1.0, 0.0]));
        assert!(down.normals.iter().all(|n| n.0 == [0.0, -1.0, 0.0]));
    }

    #[test]
    fn hexagon_texcoords_drop_the_normal_axis() {
        let hexagon = generate_hexagon(0.5, [0.0; 3], false);
        assert_eq!(hexagon.tex_coords[0].0, [1.0, 1.0]);
        for (position, tex_coord) in hexagon.positions.iter().zip(&hexagon.tex_coords) {
            assert_abs_diff_eq!(tex_coord.0[0], position.0[0] * 2.0 + 1.0);
            assert_abs_diff_eq!(tex_coord.0[1], position.0[2] * 2.0 + 1.0);
        }
    }

    #[test]
    fn hexagon_follows_its_center() {
        let center = [1.0, 2.0, 3.0];
        let hexagon = generate_hexagon(0.5, center, false);
        assert_eq!(hexagon.positions[0].0, center);
        for rim in &hexagon.positions[1..] {
            let offset = [rim.0[0] - 1.0, rim.0[1] - 2.0, rim.0[2] - 3.0];
            assert_abs_diff_eq!(length(offset), 0.5, epsilon = 1e-5);
        }
    }
}
