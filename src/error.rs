//! Error types shared across the renderer
//!
//! Startup failures (shader fetch, shader build, device creation) are fatal
//! and surface through [`RenderError`]. Steady-state failures (texture loads,
//! unknown shapes) are logged and the frame still completes.

use thiserror::Error;

use crate::gfx::shader::ShaderStage;

/// An asset (shader source or texture image) could not be fetched.
///
/// `status` follows HTTP conventions so filesystem and network sources
/// report failures the same way: 404 for a missing file, 403 for a
/// permission problem, 500 for anything else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch '{url}' (status {status})")]
pub struct AssetFetchError {
    pub url: String,
    pub status: u16,
}

impl AssetFetchError {
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
        }
    }

    /// Maps an I/O error from a filesystem read onto a fetch status.
    pub fn from_io(url: impl Into<String>, error: &std::io::Error) -> Self {
        let status = match error.kind() {
            std::io::ErrorKind::NotFound => 404,
            std::io::ErrorKind::PermissionDenied => 403,
            _ => 500,
        };
        Self::new(url, status)
    }
}

/// A shader program failed to compile or link.
///
/// The diagnostic is the full compiler or linker output, suitable for
/// showing to a developer verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderBuildError {
    #[error("failed to compile {stage} shader of program '{program}':\n{diagnostic}")]
    Compile {
        program: String,
        stage: ShaderStage,
        diagnostic: String,
    },
    #[error("failed to link program '{program}':\n{diagnostic}")]
    Link { program: String, diagnostic: String },
}

impl ShaderBuildError {
    pub fn program(&self) -> &str {
        match self {
            Self::Compile { program, .. } | Self::Link { program, .. } => program,
        }
    }

    pub fn diagnostic(&self) -> &str {
        match self {
            Self::Compile { diagnostic, .. } | Self::Link { diagnostic, .. } => diagnostic,
        }
    }
}

/// A name from the host did not map onto a supported shape or mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedShapeOrMode {
    #[error("unknown shading algorithm '{0}' (expected 'gouraud' or 'phong')")]
    ShadingAlgorithm(String),
    #[error("unknown shape '{0}' (expected 'plane', 'cube', 'sphere' or 'custom')")]
    Shape(String),
    #[error("unknown appearance mode '{0}' (expected 'material' or 'textured')")]
    Appearance(String),
}

/// A texture image could not be loaded. Never fatal.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error(transparent)]
    Fetch(#[from] AssetFetchError),
    #[error("failed to decode image '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
}

/// Failures of the GPU backend itself.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to create rendering surface: {0}")]
    CreateSurface(String),
    #[error("no suitable graphics adapter: {0}")]
    Adapter(String),
    #[error("failed to request a device: {0}")]
    RequestDevice(String),
    #[error("surface error: {0}")]
    Surface(String),
}

/// Umbrella error for the renderer's fallible operations.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    AssetFetch(#[from] AssetFetchError),
    #[error(transparent)]
    ShaderBuild(#[from] ShaderBuildError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedShapeOrMode),
    #[error("camera position and target coincide; the view is degenerate")]
    DegenerateCamera,
}
