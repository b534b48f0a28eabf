use std::collections::HashMap;
use std::str::FromStr;

use futures::future::try_join_all;

use super::{LinkedProgram, ShaderStage, UniformLocation};
use crate::assets::AssetSource;
use crate::error::{AssetFetchError, ShaderBuildError, UnsupportedShapeOrMode};
use crate::gfx::device::{GraphicsDevice, ProgramId};
use crate::gfx::scene::AppearanceMode;

/// Renderer-wide choice of where illumination is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingAlgorithm {
    /// Per vertex, interpolated across the triangle
    #[default]
    Gouraud,
    /// Per fragment, from interpolated normals
    Phong,
}

impl ShadingAlgorithm {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ShadingAlgorithm::Gouraud => "gouraud",
            ShadingAlgorithm::Phong => "phong",
        }
    }
}

impl FromStr for ShadingAlgorithm {
    type Err = UnsupportedShapeOrMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gouraud" => Ok(ShadingAlgorithm::Gouraud),
            "phong" => Ok(ShadingAlgorithm::Phong),
            other => Err(UnsupportedShapeOrMode::ShadingAlgorithm(other.to_owned())),
        }
    }
}

/// One of the five programs the renderer draws with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Shaded(ShadingAlgorithm, AppearanceMode),
    /// Unlit, self-colored; used for light markers
    Emissive,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 5] = [
        ProgramKind::Shaded(ShadingAlgorithm::Gouraud, AppearanceMode::Material),
        ProgramKind::Shaded(ShadingAlgorithm::Gouraud, AppearanceMode::Textured),
        ProgramKind::Shaded(ShadingAlgorithm::Phong, AppearanceMode::Material),
        ProgramKind::Shaded(ShadingAlgorithm::Phong, AppearanceMode::Textured),
        ProgramKind::Emissive,
    ];

    /// Program name, also the stem of its shader files
    pub fn name(self) -> &'static str {
        match self {
            ProgramKind::Shaded(ShadingAlgorithm::Gouraud, AppearanceMode::Material) => "gouraud_color",
            ProgramKind::Shaded(ShadingAlgorithm::Gouraud, AppearanceMode::Textured) => "gouraud_texture",
            ProgramKind::Shaded(ShadingAlgorithm::Phong, AppearanceMode::Material) => "phong_color",
            ProgramKind::Shaded(ShadingAlgorithm::Phong, AppearanceMode::Textured) => "phong_texture",
            ProgramKind::Emissive => "emissive",
        }
    }

    /// Path of one stage's source relative to the asset root
    pub fn shader_path(self, dir: &str, stage: ShaderStage) -> String {
        let file = format!("{}.{}", self.name(), stage.extension());
        if dir.is_empty() {
            file
        } else {
            format!("{}/{}", dir.trim_end_matches('/'), file)
        }
    }
}

/// Vertex and fragment WGSL text of every program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    sources: HashMap<ProgramKind, (String, String)>,
}

macro_rules! embedded_program {
    ($kind:expr, $name:literal) => {
        (
            $kind,
            (
                include_str!(concat!("../../../shaders/", $name, ".vert.wgsl")).to_owned(),
                include_str!(concat!("../../../shaders/", $name, ".frag.wgsl")).to_owned(),
            ),
        )
    };
}

impl ShaderSources {
    /// The shaders shipped in the crate's `shaders/` directory
    pub fn embedded() -> Self {
        use AppearanceMode::{Material, Textured};
        use ShadingAlgorithm::{Gouraud, Phong};

        Self {
            sources: HashMap::from([
                embedded_program!(ProgramKind::Shaded(Gouraud, Material), "gouraud_color"),
                embedded_program!(ProgramKind::Shaded(Gouraud, Textured), "gouraud_texture"),
                embedded_program!(ProgramKind::Shaded(Phong, Material), "phong_color"),
                embedded_program!(ProgramKind::Shaded(Phong, Textured), "phong_texture"),
                embedded_program!(ProgramKind::Emissive, "emissive"),
            ]),
        }
    }

    /// Fetches all ten stage sources concurrently.
    ///
    /// Fails with the first fetch error; nothing is returned unless every
    /// source arrived.
    pub async fn fetch(source: &dyn AssetSource, dir: &str) -> Result<Self, AssetFetchError> {
        let requests = ProgramKind::ALL.iter().flat_map(|kind| {
            [ShaderStage::Vertex, ShaderStage::Fragment].map(|stage| {
                let path = kind.shader_path(dir, stage);
                let fetch = source.fetch(&path);
                async move {
                    let bytes = fetch.await?;
                    String::from_utf8(bytes).map_err(|_| AssetFetchError::new(path, 415))
                }
            })
        });

        let mut texts = try_join_all(requests).await?.into_iter();
        let mut sources = HashMap::new();
        for kind in ProgramKind::ALL {
            if let (Some(vertex), Some(fragment)) = (texts.next(), texts.next()) {
                sources.insert(kind, (vertex, fragment));
            }
        }
        log::info!("Fetched {} shader sources from '{}'", sources.len() * 2, dir);

        Ok(Self { sources })
    }

    pub fn get(&self, kind: ProgramKind) -> Option<(&str, &str)> {
        self.sources
            .get(&kind)
            .map(|(vertex, fragment)| (vertex.as_str(), fragment.as_str()))
    }

    /// Replaces one program's sources
    pub fn insert(&mut self, kind: ProgramKind, vertex: impl Into<String>, fragment: impl Into<String>) {
        self.sources.insert(kind, (vertex.into(), fragment.into()));
    }
}

/// A program created on the device with its resolved uniform locations
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    locations: HashMap<String, UniformLocation>,
    light_positions: Vec<UniformLocation>,
    light_colors: Vec<UniformLocation>,
}

impl ShaderProgram {
    fn new(id: ProgramId, linked: &LinkedProgram) -> Self {
        let locations: HashMap<String, UniformLocation> = linked
            .uniforms
            .iter()
            .enumerate()
            .map(|(index, uniform)| (uniform.name.clone(), UniformLocation(index as u32)))
            .collect();

        // Light arrays are contiguous from index 0
        let indexed = |array: &str| -> Vec<UniformLocation> {
            (0..)
                .map_while(|i| locations.get(&format!("{array}[{i}]")).copied())
                .collect()
        };
        let light_positions = indexed("light_positions");
        let light_colors = indexed("light_colors");

        Self {
            id,
            label: linked.label.clone(),
            locations,
            light_positions,
            light_colors,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.locations.get(name).copied()
    }

    /// Number of point lights the program's uniform arrays can hold
    pub fn light_capacity(&self) -> usize {
        self.light_positions.len().min(self.light_colors.len())
    }

    /// Cached `light_positions[i]` and `light_colors[i]` locations
    pub fn light_locations(&self, index: usize) -> Option<(UniformLocation, UniformLocation)> {
        Some((*self.light_positions.get(index)?, *self.light_colors.get(index)?))
    }

    pub fn uniform_count(&self) -> usize {
        self.locations.len()
    }
}

/// Compiles, links and creates one program on the device.
pub fn build_program<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    label: &str,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<ShaderProgram, ShaderBuildError> {
    let linked = LinkedProgram::link(label, vertex_source, fragment_source)?;
    let id = device.create_program(&linked)?;
    let program = ShaderProgram::new(id, &linked);
    log::debug!(
        "Built program '{}' with {} uniforms",
        label,
        program.uniform_count()
    );
    Ok(program)
}

/// The five programs, indexed by shading algorithm and appearance
#[derive(Debug, Clone)]
pub struct ProgramRegistry {
    shaded: [[ShaderProgram; 2]; 2],
    emissive: ShaderProgram,
}

impl ProgramRegistry {
    /// Builds every program; the first failure aborts.
    pub fn build<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        sources: &ShaderSources,
    ) -> Result<Self, ShaderBuildError> {
        use AppearanceMode::{Material, Textured};
        use ShadingAlgorithm::{Gouraud, Phong};

        let mut build = |kind: ProgramKind| -> Result<ShaderProgram, ShaderBuildError> {
            let (vertex, fragment) = sources.get(kind).ok_or_else(|| ShaderBuildError::Link {
                program: kind.name().to_owned(),
                diagnostic: "no shader sources were provided".to_owned(),
            })?;
            build_program(device, kind.name(), vertex, fragment)
        };

        let registry = Self {
            shaded: [
                [
                    build(ProgramKind::Shaded(Gouraud, Material))?,
                    build(ProgramKind::Shaded(Gouraud, Textured))?,
                ],
                [
                    build(ProgramKind::Shaded(Phong, Material))?,
                    build(ProgramKind::Shaded(Phong, Textured))?,
                ],
            ],
            emissive: build(ProgramKind::Emissive)?,
        };
        log::info!("Built {} shader programs", ProgramKind::ALL.len());
        Ok(registry)
    }

    pub fn get(&self, algorithm: ShadingAlgorithm, appearance: AppearanceMode) -> &ShaderProgram {
        &self.shaded[algorithm.index()][appearance.index()]
    }

    pub fn emissive(&self) -> &ShaderProgram {
        &self.emissive
    }
}
