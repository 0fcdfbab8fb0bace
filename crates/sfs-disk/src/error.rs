#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("device too small: layout needs {needed} blocks, device has {available}")]
    DeviceTooSmall { needed: u64, available: u32 },

    #[error("not a formatted device: magic {found:#x}, expected {expected:#x}")]
    BadMagic { found: i32, expected: i32 },

    #[error("superblock field {field} is {found}, geometry requires {expected}")]
    LayoutMismatch {
        field: &'static str,
        found: i32,
        expected: i32,
    },

    #[error("buffer of {actual} bytes cannot hold {needed} bytes of records")]
    ShortBuffer { needed: usize, actual: usize },

    #[error("record encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("record decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}
