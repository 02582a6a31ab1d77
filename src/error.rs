use thiserror::Error;

/// Publisher pipeline errors.
#[derive(Debug, Error)]
pub enum BridgecamError {
    #[error("no suitable GPU adapter: {0}")]
    AdapterRequest(String),

    #[error("GPU device request failed: {0}")]
    DeviceRequest(String),

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("bridge connection failed: {0}")]
    Connect(String),

    #[error("bridge transport failed: {0}")]
    Transport(String),

    #[error("message serialisation failed: {0}")]
    Serialise(String),

    #[error("config error: {0}")]
    Config(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, BridgecamError>;
