use std::{convert::TryFrom, path::Path};

use async_std::io::{prelude::*, Write};
use async_trait::async_trait;
use memmap2::Mmap;
use tracing::debug;

use crate::{
    error::{Error, MapError},
    index::LineTable,
    Result, Storage,
};

/// A file which is mapped into memory as a whole. Reading a range is a plain slice of the
/// mapping, no system call is involved.
#[derive(Debug)]
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    /// Map the file at `path` and build its line table by scanning the mapping.
    ///
    /// Empty files can't be mapped and return `MapError::Empty`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(MappedFile, LineTable)> {
        let file = std::fs::File::open(path.as_ref())?;

        let len = file.metadata()?.len();
        if len == 0 {
            return Err(MapError::Empty.into());
        }

        // Safety: the mapping is read-only and files are not expected to change while indexed.
        let mmap = unsafe { Mmap::map(&file) }.map_err(MapError::Io)?;
        debug!(path = %path.as_ref().display(), bytes = len, "mapped file");

        // The mapping stays valid after the descriptor is closed
        drop(file);

        let mapped = MappedFile { mmap };
        let table = LineTable::from_bytes(mapped.as_bytes());
        Ok((mapped, table))
    }

    /// Returns the whole mapped content
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Returns `length` bytes starting at `offset` without copying.
    pub fn slice(&self, offset: u64, length: u64) -> Result<&[u8]> {
        self.check_range(offset, length)?;

        // check_range guarantees both ends lie within the mapping
        let start = usize::try_from(offset).map_err(|_| self.out_of_range(offset, length))?;
        let end = usize::try_from(offset + length).map_err(|_| self.out_of_range(offset, length))?;
        Ok(&self.mmap[start..end])
    }

    #[inline]
    fn out_of_range(&self, offset: u64, length: u64) -> Error {
        Error::OutOfRange {
            offset,
            length,
            size: self.size(),
        }
    }
}

#[async_trait]
impl Storage for MappedFile {
    #[inline]
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    async fn read_range(&mut self, offset: u64, length: u64, buf: &mut Vec<u8>) -> Result<usize> {
        let data = self.slice(offset, length)?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    async fn write_to<W: Write + Unpin + Send>(&mut self, writer: &mut W) -> Result<u64> {
        writer.write_all(&self.mmap).await?;
        Ok(self.size())
    }
}

#[cfg(test)]
mod tests {
    use rand::{distributions::Uniform, Rng};

    use super::*;
    use crate::file::BufferedFile;

    const TEST_FILES: &[&str] = &["simple", "no_trailing_newline", "blank_lines"];

    #[test]
    fn test_open_empty() {
        let res = MappedFile::open("./testfiles/empty");
        assert!(matches!(res, Err(Error::Map(MapError::Empty))));
    }

    #[test]
    fn test_open_missing() {
        let res = MappedFile::open("./testfiles/does_not_exist");
        assert!(matches!(res, Err(Error::Io(_))));
    }

    #[test]
    fn test_slice() {
        let (file, table) = MappedFile::open("./testfiles/no_trailing_newline").unwrap();
        let original = std::fs::read("./testfiles/no_trailing_newline").unwrap();

        assert_eq!(file.as_bytes(), &original[..]);
        for (line, entry) in original.split(|i| *i == b'\n').zip(table.iter()) {
            assert_eq!(file.slice(entry.offset, entry.length).unwrap(), line);
        }

        let size = file.size();
        assert!(file.slice(size, 0).unwrap().is_empty());
        assert!(matches!(
            file.slice(size, 1),
            Err(Error::OutOfRange { .. })
        ));
        assert!(file.slice(u64::MAX, u64::MAX).is_err());
    }

    #[async_std::test]
    async fn test_same_as_buffered() {
        for name in TEST_FILES {
            let path = format!("./testfiles/{}", name);

            let (mut mapped, mapped_table) = MappedFile::open(&path).unwrap();
            let (mut buffered, buffered_table) = BufferedFile::open(&path).await.unwrap();
            assert_eq!(mapped_table, buffered_table);

            // Sequentially
            for entry in mapped_table.iter() {
                let mut a = Vec::new();
                let mut b = Vec::new();
                mapped
                    .read_range(entry.offset, entry.length, &mut a)
                    .await
                    .unwrap();
                buffered
                    .read_range(entry.offset, entry.length, &mut b)
                    .await
                    .unwrap();
                assert_eq!(a, b);
                assert!(!a.contains(&b'\n'));
            }

            // Random order
            let lines: Vec<_> = rand::thread_rng()
                .sample_iter(Uniform::new(0, mapped_table.len()))
                .take(mapped_table.len() * 3)
                .collect();

            for line in lines {
                let entry = mapped_table.get(line).unwrap();
                let mut a = Vec::new();
                let mut b = Vec::new();
                mapped
                    .read_range(entry.offset, entry.length, &mut a)
                    .await
                    .unwrap();
                buffered
                    .read_range(entry.offset, entry.length, &mut b)
                    .await
                    .unwrap();
                assert_eq!(a, b);
            }

            let mut a = Vec::new();
            let mut b = Vec::new();
            mapped.write_to(&mut a).await.unwrap();
            buffered.write_to(&mut b).await.unwrap();
            assert_eq!(a, b);
            assert_eq!(a, std::fs::read(&path).unwrap());
        }
    }
}
