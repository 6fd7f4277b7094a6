use std::fmt::{Display, Formatter};
use std::io;

/// Errors returned by [`TemporaryFile`](crate::TemporaryFile) operations.
///
/// Every variant except [`Error::InvalidDirectory`] wraps the I/O error of the
/// call that failed. End of stream is not an error; reads signal it with `Ok(0)`.
#[derive(Debug)]
pub enum Error {
    /// An invalid or missing directory was specified.
    InvalidDirectory,
    /// The backing file could not be created.
    Creation(io::Error),
    /// The source stream could not be copied into the backing file.
    Copy(io::Error),
    /// Reading from the backing file failed.
    Read(io::Error),
    /// Writing to the backing file failed.
    Write(io::Error),
    /// Repositioning the cursor failed.
    Seek(io::Error),
    /// Closing the file handle failed. The backing file was not deleted.
    Close(io::Error),
    /// The file handle was closed but the backing file could not be deleted.
    Delete(io::Error),
}

impl Error {
    /// Returns the underlying I/O error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::InvalidDirectory => None,
            Self::Creation(e)
            | Self::Copy(e)
            | Self::Read(e)
            | Self::Write(e)
            | Self::Seek(e)
            | Self::Close(e)
            | Self::Delete(e) => Some(e),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDirectory => write!(f, "An invalid directory was specified"),
            Self::Creation(e) => write!(f, "Failed to create the temporary file: {e}"),
            Self::Copy(e) => write!(f, "Failed to copy the source into the temporary file: {e}"),
            Self::Read(e) => write!(f, "Failed to read from the temporary file: {e}"),
            Self::Write(e) => write!(f, "Failed to write to the temporary file: {e}"),
            Self::Seek(e) => write!(f, "Failed to seek in the temporary file: {e}"),
            Self::Close(e) => write!(f, "Failed to close the temporary file: {e}"),
            Self::Delete(e) => write!(f, "Failed to delete the temporary file: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.io_error().map(|e| e as _)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidDirectory => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            Error::Creation(e)
            | Error::Copy(e)
            | Error::Read(e)
            | Error::Write(e)
            | Error::Seek(e)
            | Error::Close(e)
            | Error::Delete(e) => e,
        }
    }
}
