use std::{convert::TryFrom, io::SeekFrom, path::Path};

use async_std::{
    fs,
    io::{self, prelude::*, BufReader, Read, Seek, Write},
};
use async_trait::async_trait;
use tracing::debug;

use crate::{index::LineTable, Result, Storage};

/// A buffered file storage
pub type BufferedFile = BufferedSource<fs::File>;

/// Storage which repositions a buffered reader and reads the requested bytes on every access.
#[derive(Debug)]
pub struct BufferedSource<R: Read + Seek + Unpin + Send> {
    reader: BufReader<R>,
    size: u64,
}

impl BufferedFile {
    /// Open a file and build its line table. The table is built from the same handle which is
    /// used for reading afterwards.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<(BufferedFile, LineTable)> {
        let file = fs::File::open(async_std::path::Path::new(path.as_ref())).await?;
        debug!(path = %path.as_ref().display(), "opened file for buffered reading");
        let mut source = BufferedSource::new(file).await?;
        let table = source.index().await?;
        Ok((source, table))
    }
}

impl<R: Read + Seek + Unpin + Send> BufferedSource<R> {
    /// Wraps `inner` into a buffered storage. The size of the source is determined by seeking to
    /// its end.
    pub async fn new(inner: R) -> Result<Self> {
        let mut reader = BufReader::new(inner);
        let size = reader.seek(SeekFrom::End(0)).await?;
        reader.seek(SeekFrom::Start(0)).await?;
        Ok(Self { reader, size })
    }

    /// Scan the whole source and build its line table
    #[inline]
    pub async fn index(&mut self) -> Result<LineTable> {
        LineTable::build(&mut self.reader).await
    }
}

#[async_trait]
impl<R: Read + Seek + Unpin + Send> Storage for BufferedSource<R> {
    #[inline]
    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&mut self, offset: u64, length: u64, buf: &mut Vec<u8>) -> Result<usize> {
        self.check_range(offset, length)?;
        let length =
            usize::try_from(length).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        self.reader.seek(SeekFrom::Start(offset)).await?;

        let start = buf.len();
        buf.resize(start + length, 0);
        if let Err(err) = self.reader.read_exact(&mut buf[start..]).await {
            buf.truncate(start);
            return Err(err.into());
        }

        Ok(length)
    }

    async fn write_to<W: Write + Unpin + Send>(&mut self, writer: &mut W) -> Result<u64> {
        // The position is wherever the last read left it, so start over from the beginning
        self.reader.seek(SeekFrom::Start(0)).await?;
        Ok(io::copy(&mut self.reader, writer).await?)
    }
}
