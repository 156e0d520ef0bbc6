/// Error code reported by the GPU API.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum GlError {
    #[error("GL_INVALID_ENUM")]
    InvalidEnum,
    #[error("GL_INVALID_VALUE")]
    InvalidValue,
    #[error("GL_INVALID_OPERATION")]
    InvalidOperation,
    #[error("GL_INVALID_FRAMEBUFFER_OPERATION")]
    InvalidFramebufferOperation,
    #[error("GL_OUT_OF_MEMORY")]
    OutOfMemory,
}
