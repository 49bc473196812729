use thiserror::Error;

/// Errors raised while parsing BoC bytes or reading cells
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TvmError {
    #[error("Malformed BoC: {0}")]
    MalformedBoc(String),
    #[error("Malformed cell: {0}")]
    MalformedCell(String),
    #[error("Cell overflow: {0}")]
    Overflow(String),
}

pub type Result<T> = std::result::Result<T, TvmError>;

macro_rules! boc_bail {
    ($($arg:tt)*) => {
        return Err($crate::tvm::error::TvmError::MalformedBoc(format!($($arg)*)))
    };
}

macro_rules! cell_bail {
    ($($arg:tt)*) => {
        return Err($crate::tvm::error::TvmError::MalformedCell(format!($($arg)*)))
    };
}

pub(crate) use boc_bail;
pub(crate) use cell_bail;
