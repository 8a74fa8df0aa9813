use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocError {
    #[error("Out of space: requested {requested} clusters, only {found} free")]
    OutOfSpace { requested: u64, found: u64 },

    #[error("Invalid cluster count: allocation must request at least one cluster")]
    InvalidCount,

    #[error("Invalid cluster range: start {start}, length {length} (volume has {total} clusters)")]
    InvalidRange { start: u64, length: u64, total: u64 },

    #[error("Zero-length cluster range at {start}")]
    ZeroLengthRange { start: u64 },

    #[error("Invalid volume geometry: {0}")]
    InvalidGeometry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl AllocError {
    /// True for the out-of-space condition, the only error a caller can
    /// expect to clear by freeing clusters elsewhere.
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, AllocError::OutOfSpace { .. })
    }
}

pub type Result<T> = std::result::Result<T, AllocError>;
