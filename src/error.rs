use thiserror::Error;

/// Errors produced by the bit-string, cell, and Bag-of-Cells codec.
#[derive(Debug, Error)]
pub enum CellError {
    #[error("capacity overflow: {0}")]
    CapacityOverflow(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("unsupported feature: {0}")]
    Unsupported(String),
}

impl From<hex::FromHexError> for CellError {
    fn from(e: hex::FromHexError) -> Self {
        CellError::Malformed(format!("invalid hex: {e}"))
    }
}

impl From<base64::DecodeError> for CellError {
    fn from(e: base64::DecodeError) -> Self {
        CellError::Malformed(format!("invalid base64: {e}"))
    }
}

pub type CellResult<T> = Result<T, CellError>;
