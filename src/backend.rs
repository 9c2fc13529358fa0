use async_std::io::Write;
use async_trait::async_trait;
use std::path::Path;

use crate::{file::BufferedFile, index::LineTable, mmap::MappedFile, Result, Storage};

/// The available storage strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Seek and read the file on every access
    Buffered,
    /// Map the whole file into memory once
    Mapped,
}

impl Default for BackendKind {
    #[inline]
    fn default() -> Self {
        BackendKind::Buffered
    }
}

/// A storage backend chosen at runtime
#[derive(Debug)]
pub enum Backend {
    Buffered(BufferedFile),
    Mapped(MappedFile),
}

impl Backend {
    /// Open the file at `path` using the storage strategy `kind` and build its line table.
    pub async fn open<P: AsRef<Path>>(path: P, kind: BackendKind) -> Result<(Backend, LineTable)> {
        let path = path.as_ref();
        Ok(match kind {
            BackendKind::Buffered => {
                let (file, table) = BufferedFile::open(path).await?;
                (Backend::Buffered(file), table)
            }
            BackendKind::Mapped => {
                let (file, table) = MappedFile::open(path)?;
                (Backend::Mapped(file), table)
            }
        })
    }

    #[inline]
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Buffered(_) => BackendKind::Buffered,
            Backend::Mapped(_) => BackendKind::Mapped,
        }
    }
}

#[async_trait]
impl Storage for Backend {
    #[inline]
    fn size(&self) -> u64 {
        match self {
            Backend::Buffered(file) => file.size(),
            Backend::Mapped(file) => file.size(),
        }
    }

    #[inline]
    async fn read_range(&mut self, offset: u64, length: u64, buf: &mut Vec<u8>) -> Result<usize> {
        match self {
            Backend::Buffered(file) => file.read_range(offset, length, buf).await,
            Backend::Mapped(file) => file.read_range(offset, length, buf).await,
        }
    }

    #[inline]
    async fn write_to<W: Write + Unpin + Send>(&mut self, writer: &mut W) -> Result<u64> {
        match self {
            Backend::Buffered(file) => file.write_to(writer).await,
            Backend::Mapped(file) => file.write_to(writer).await,
        }
    }
}
