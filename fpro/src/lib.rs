pub mod bridge;
pub mod gpo;
pub mod jstk;
pub mod osd;
pub mod ps2;
pub mod spi;

use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum FproError {
    #[error("peripheral slot already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for FproError {
    fn from(err: std::io::Error) -> Self {
        FproError::Io(err.kind())
    }
}

pub type FproResult<T> = Result<T, FproError>;
