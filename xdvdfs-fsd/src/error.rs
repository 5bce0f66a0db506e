use thiserror::Error;

use crate::container::ContainerError;

/// Top-level setup errors. Any of these is fatal: the program prints the
/// message and exits before Dokan ever starts.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("could not open image file: {0}")]
    FileOpenError(#[source] std::io::Error),
    #[error("not a valid XDVDFS image: {0}")]
    FormatError(#[source] xdvdfs::read::FormatError),
    #[error("mount point {0} already exists")]
    MountPointExists(std::path::PathBuf),
    #[error("{0}")]
    BridgeError(String),
}

impl From<ContainerError> for AppError {
    fn from(value: ContainerError) -> Self {
        match value {
            ContainerError::FileOpen(e) => AppError::FileOpenError(e),
            ContainerError::Format(e) => AppError::FormatError(e),
        }
    }
}
