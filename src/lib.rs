//!Index a text file by its lines once and read any of them by number afterwards, either through
//!a buffered file or a memory mapping.

/// Selecting and opening a storage backend
pub mod backend;
pub mod config;
/// The deadline racing the first answer of a session
pub mod deadline;
pub mod error;
/// Buffered storage over any seekable reader
pub mod file;
/// The line table of files
pub mod index;
/// Memory mapped storage implementation
pub mod mmap;
/// The interactive line lookup session
pub mod session;

pub use backend::{Backend, BackendKind};
pub use config::SessionConfig;
pub use error::{Error, MapError};
pub use file::{BufferedFile, BufferedSource};
pub use index::{LineEntry, LineTable};
pub use mmap::MappedFile;
pub use session::{Outcome, Session};

use async_std::io::Write;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, error::Error>;

/// Random access to the raw bytes of an indexed source.
#[async_trait]
pub trait Storage: Send {
    /// Returns the total size of the source in bytes
    fn size(&self) -> u64;

    /// Should append exactly `length` bytes starting at `offset` to `buf` and return the amount
    /// of bytes appended. Ranges reaching past `size()` must fail with `Error::OutOfRange`
    /// without reading anything.
    async fn read_range(&mut self, offset: u64, length: u64, buf: &mut Vec<u8>) -> Result<usize>;

    /// Write the entire source into `writer`, regardless of previous reads.
    async fn write_to<W: Write + Unpin + Send>(&mut self, writer: &mut W) -> Result<u64>;

    /// Returns an error if `offset..offset + length` doesn't lie within the source
    #[inline]
    fn check_range(&self, offset: u64, length: u64) -> Result<()> {
        let size = self.size();
        match offset.checked_add(length) {
            Some(end) if end <= size => Ok(()),
            _ => Err(Error::OutOfRange {
                offset,
                length,
                size,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_line<S: Storage>(storage: &mut S, table: &LineTable, line: usize) -> Vec<u8> {
        let entry = table.get(line).unwrap();
        let mut buf = Vec::new();
        storage
            .read_range(entry.offset, entry.length, &mut buf)
            .await
            .unwrap();
        buf
    }

    #[async_std::test]
    async fn test_backends_match_std_lines() {
        let input_files = &["simple", "no_trailing_newline", "blank_lines"];

        for input_file in input_files {
            let file = format!("./testfiles/{}", input_file);
            let original = std::fs::read(&file).unwrap();
            let lines: Vec<&[u8]> = original.split(|i| *i == b'\n').collect();

            for kind in &[BackendKind::Buffered, BackendKind::Mapped] {
                let (mut backend, table) = Backend::open(&file, *kind).await.unwrap();

                // `split` yields an empty tail when the file ends with a terminator
                let expected_lines = if original.ends_with(b"\n") {
                    lines.len() - 1
                } else {
                    lines.len()
                };
                assert_eq!(table.len(), expected_lines);
                assert!(table.is_contiguous());

                for (pos, line) in lines.iter().take(table.len()).enumerate() {
                    assert_eq!(read_line(&mut backend, &table, pos).await, *line);
                }
            }
        }
    }

    #[test]
    fn test_check_range() {
        struct Fixed(u64);

        #[async_trait]
        impl Storage for Fixed {
            fn size(&self) -> u64 {
                self.0
            }

            async fn read_range(
                &mut self,
                _offset: u64,
                _length: u64,
                _buf: &mut Vec<u8>,
            ) -> Result<usize> {
                unimplemented!()
            }

            async fn write_to<W: Write + Unpin + Send>(&mut self, _writer: &mut W) -> Result<u64> {
                unimplemented!()
            }
        }

        let storage = Fixed(10);
        assert!(storage.check_range(0, 10).is_ok());
        assert!(storage.check_range(10, 0).is_ok());
        assert!(storage.check_range(5, 6).is_err());
        assert!(storage.check_range(11, 0).is_err());
        assert!(storage.check_range(1, u64::MAX).is_err());
    }
}
