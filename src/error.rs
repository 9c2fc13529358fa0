use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Requested byte range reaches past the end of the source
    #[error("range {offset}+{length} exceeds source size of {size} bytes")]
    OutOfRange { offset: u64, length: u64, size: u64 },
    /// On reqest for a non existing line
    #[error("line does not exist")]
    OutOfBounds,
    /// Input was not a plain decimal number
    #[error("invalid input {0:?}, expected digits only")]
    Validation(String),
    #[error("can't map file")]
    Map(#[from] MapError),
}

/// Failures setting up a memory mapping
#[derive(Debug, Error)]
pub enum MapError {
    #[error("file is empty")]
    Empty,
    #[error(transparent)]
    Io(std::io::Error),
}
