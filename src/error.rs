use std::time::Duration;

use thiserror::Error;

/// One-time setup failures of the GPU reduction context.
#[derive(Debug, Error)]
pub enum InitializationError {
    /// No compute-capable adapter is available.
    #[error("no compute-capable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to create a device.
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// A reduction kernel failed shader validation or pipeline creation.
    #[error("failed to build compute pipeline `{pipeline}`: {message}")]
    ShaderCompilation {
        pipeline: &'static str,
        message: String,
    },
}

/// Library error type for reduction operations.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// The GPU backend could not be brought up.
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// A caller-supplied parameter is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A per-call GPU resource could not be allocated or mapped.
    #[error("failed to allocate {what}: {reason}")]
    ResourceAllocation { what: &'static str, reason: String },

    /// A compute dispatch did not finish within the configured timeout.
    #[error("compute dispatch did not complete within {waited:?}")]
    Timeout { waited: Duration },

    /// The source image could not be decoded.
    #[error(transparent)]
    Decode(#[from] image::ImageError),
}

impl ReduceError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn allocation(what: &'static str, reason: impl Into<String>) -> Self {
        Self::ResourceAllocation {
            what,
            reason: reason.into(),
        }
    }

    /// True for failures of the device during a call, which the CPU path
    /// does not share.
    pub fn is_device_failure(&self) -> bool {
        matches!(self, Self::ResourceAllocation { .. } | Self::Timeout { .. })
    }
}

pub type Result<T, E = ReduceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_runtime_gpu_errors_are_device_failures() {
        assert!(ReduceError::allocation("source texture", "too large").is_device_failure());
        assert!(
            ReduceError::Timeout {
                waited: Duration::from_secs(1)
            }
            .is_device_failure()
        );
        assert!(!ReduceError::invalid("block_size", "must be at least 1").is_device_failure());
    }
}
