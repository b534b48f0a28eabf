//! naga-based parsing, validation and interface reflection of one stage

use naga::{AddressSpace, ArraySize, Binding, Handle, Module, ResourceBinding, Type, TypeInner};

use super::{ShaderStage, UniformInfo, UniformType};
use crate::error::ShaderBuildError;

const UNIFORM_BINDING: ResourceBinding = ResourceBinding {
    group: 0,
    binding: 0,
};
const TEXTURE_BINDING: ResourceBinding = ResourceBinding {
    group: 1,
    binding: 0,
};
const SAMPLER_BINDING: ResourceBinding = ResourceBinding {
    group: 1,
    binding: 1,
};

/// A user-defined stage input or output
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct InterfaceVariable {
    pub location: u32,
    pub name: Option<String>,
}

/// What linking needs to know about one validated stage
#[derive(Debug, Clone)]
pub(super) struct StageInterface {
    pub entry_point: String,
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<u32>,
    pub uniforms: Vec<UniformInfo>,
    pub block_size: u32,
}

pub(super) fn reflect_stage(
    program: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<StageInterface, ShaderBuildError> {
    let compile_error = |diagnostic: String| ShaderBuildError::Compile {
        program: program.to_owned(),
        stage,
        diagnostic,
    };
    let link_error = |diagnostic: String| ShaderBuildError::Link {
        program: program.to_owned(),
        diagnostic,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| compile_error(err.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| compile_error(err.emit_to_string(source)))?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage.to_naga())
        .ok_or_else(|| compile_error(format!("no @{stage} entry point")))?;

    let mut inputs = Vec::new();
    for argument in &entry.function.arguments {
        collect_locations(&module, argument.ty, &argument.binding, &argument.name, &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_locations(&module, result.ty, &result.binding, &None, &mut outputs);
    }

    let mut uniforms = Vec::new();
    let mut block_size = 0;
    for (_, global) in module.global_variables.iter() {
        let name = global.name.clone().unwrap_or_default();
        match global.space {
            AddressSpace::Uniform => {
                if global.binding.as_ref() != Some(&UNIFORM_BINDING) {
                    return Err(link_error(format!(
                        "uniform '{name}' must be bound at @group(0) @binding(0)"
                    )));
                }
                if block_size != 0 {
                    return Err(link_error(format!(
                        "uniform '{name}' is a second uniform block; only one is supported"
                    )));
                }
                block_size = module.types[global.ty].inner.size(module.to_ctx());
                let prefix = match module.types[global.ty].inner {
                    TypeInner::Struct { .. } => String::new(),
                    _ => name,
                };
                flatten(&module, global.ty, prefix, 0, &mut uniforms).map_err(link_error)?;
            }
            AddressSpace::Handle => match module.types[global.ty].inner {
                TypeInner::Image { .. } => {
                    if global.binding.as_ref() != Some(&TEXTURE_BINDING) {
                        return Err(link_error(format!(
                            "texture '{name}' must be bound at @group(1) @binding(0)"
                        )));
                    }
                    uniforms.push(UniformInfo {
                        name,
                        ty: UniformType::Texture2d,
                        offset: 0,
                    });
                }
                TypeInner::Sampler { .. } => {
                    if global.binding.as_ref() != Some(&SAMPLER_BINDING) {
                        return Err(link_error(format!(
                            "sampler '{name}' must be bound at @group(1) @binding(1)"
                        )));
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(StageInterface {
        entry_point: entry.name.clone(),
        inputs,
        outputs: outputs.into_iter().map(|o: InterfaceVariable| o.location).collect(),
        uniforms,
        block_size,
    })
}

/// Records `@location` bindings of an argument or result, looking inside
/// structs whose members carry the bindings.
fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: &Option<Binding>,
    name: &Option<String>,
    out: &mut Vec<InterfaceVariable>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(InterfaceVariable {
            location: *location,
            name: name.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        out.push(InterfaceVariable {
                            location,
                            name: member.name.clone(),
                        });
                    }
                }
            }
        }
    }
}

/// Expands a uniform type into leaf uniforms. Struct members keep their
/// own names at the top level; array elements become `name[i]`.
fn flatten(
    module: &Module,
    ty: Handle<Type>,
    name: String,
    offset: u32,
    out: &mut Vec<UniformInfo>,
) -> Result<(), String> {
    match &module.types[ty].inner {
        TypeInner::Struct { members, .. } => {
            for member in members {
                let member_name = member.name.clone().unwrap_or_default();
                let full_name = if name.is_empty() {
                    member_name
                } else {
                    format!("{name}.{member_name}")
                };
                flatten(module, member.ty, full_name, offset + member.offset, out)?;
            }
            Ok(())
        }
        TypeInner::Array {
            base,
            size: ArraySize::Constant(count),
            stride,
        } => {
            for index in 0..count.get() {
                flatten(
                    module,
                    *base,
                    format!("{name}[{index}]"),
                    offset + index * stride,
                    out,
                )?;
            }
            Ok(())
        }
        inner => {
            let ty = UniformType::from_naga(inner)
                .ok_or_else(|| format!("uniform '{name}' has an unsupported type"))?;
            out.push(UniformInfo { name, ty, offset });
            Ok(())
        }
    }
}
