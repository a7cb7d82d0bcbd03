//! Error types for glowtree.
//!
//! Parameter validation, emblem asset loading and viewer startup each get
//! their own error enum so callers can tell recoverable failures (a missing
//! model) from fatal ones (no GPU adapter).

use std::path::PathBuf;

/// A scene parameter outside its accepted range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// Integer parameter outside `[min, max]`.
    #[error("{name} must be within {min}..={max}, got {value}")]
    CountOutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    /// Float parameter outside `[min, max]`.
    #[error("{name} must be within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// NaN or infinite value.
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f32 },
}

/// Errors from reading a parameter file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON for [`SceneParams`](crate::SceneParams).
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The file parsed but holds out-of-range values.
    #[error(transparent)]
    Invalid(#[from] ParamError),
}

/// Errors from loading the emblem model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssetError {
    /// The model file could not be read.
    #[error("failed to read '{path}': {message}")]
    Io { path: PathBuf, message: String },
    /// The glTF importer rejected the data.
    #[error("failed to import glTF: {0}")]
    Import(String),
    /// The model contains no triangle geometry the loader can decode.
    #[error("model has no decodable triangle meshes")]
    NoGeometry,
    /// The loader thread went away without reporting a result.
    #[error("asset loader disconnected before finishing")]
    Disconnected,
    /// The load was cancelled before it finished.
    #[error("asset load cancelled")]
    Cancelled,
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; a WebGPU/Vulkan/Metal/DX12 capable GPU is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}

/// Errors that can occur when running the viewer.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// Failed to create or run the event loop.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create the window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The initial scene parameters were rejected.
    #[error(transparent)]
    Params(#[from] ParamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_error_message_names_field() {
        let err = ParamError::OutOfRange {
            name: "tree_height",
            value: 12.0,
            min: 2.0,
            max: 10.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("tree_height"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_config_error_wraps_param_error() {
        let err: ConfigError = ParamError::NotFinite {
            name: "opacity",
            value: f32::NAN,
        }
        .into();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("opacity"));
    }
}
