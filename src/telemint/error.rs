use crate::telemint::exit_code::ExitCode;
use crate::tvm::TvmError;
use thiserror::Error;

/// Failure reported by a get-method provider
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Get-method returned no data")]
    Empty,
    #[error("Get-method exited with {0}")]
    ExitCode(ExitCode),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemintError {
    #[error("Failed to call {method}: {source}")]
    FetchFailed {
        method: String,
        #[source]
        source: FetchError,
    },
    #[error("Malformed BoC: {0}")]
    MalformedBoc(String),
    #[error("Malformed cell: {0}")]
    MalformedCell(String),
    #[error("Unknown token type tag: 0x{0:02x}")]
    UnknownTokenType(u8),
}

impl From<TvmError> for TelemintError {
    fn from(err: TvmError) -> Self {
        match err {
            TvmError::MalformedBoc(msg) => TelemintError::MalformedBoc(msg),
            // Overflow only comes from building cells, which decoding never does
            TvmError::MalformedCell(msg) | TvmError::Overflow(msg) => {
                TelemintError::MalformedCell(msg)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TelemintError>;
