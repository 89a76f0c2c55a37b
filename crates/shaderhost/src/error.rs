use crate::types::ShaderStage;

/// Failures reported by [`crate::ShaderHost`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("failed to acquire rendering context: {0}")]
    ContextUnavailable(String),
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {log}")]
    Link { log: String },
    #[error("rendering context lost")]
    ContextLost,
}

impl HostError {
    /// Compile and link failures are deterministic; retrying the same source fails again.
    pub fn is_shader_error(&self) -> bool {
        matches!(self, HostError::Compile { .. } | HostError::Link { .. })
    }
}

/// Raised by a backend once its context is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rendering context lost")]
pub struct ContextLost;

impl From<ContextLost> for HostError {
    fn from(_: ContextLost) -> Self {
        HostError::ContextLost
    }
}
