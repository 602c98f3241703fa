use thiserror::Error;

/// Rejected parameter input at the store boundary.
///
/// Numeric fields never produce this; they are clamped instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("palette must contain at least one color")]
    EmptyPalette,
    #[error("invalid color `{0}` (expected #rgb, #rrggbb or #rrggbbaa)")]
    InvalidColor(String),
    #[error("unknown style `{0}`")]
    UnknownStyle(String),
}

/// Failure to bring up a texture or audio source.
///
/// None of these are fatal: the caller is told, and the render loop keeps
/// running in whatever mode it was already in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("device or API unavailable: {0}")]
    Unavailable(String),
    #[error("media failed to decode: {0}")]
    Decode(String),
    #[error("superseded by a newer request")]
    Cancelled,
}

/// A software drawing surface could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RasterError {
    #[error("cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },
}
