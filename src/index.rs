use std::{convert::TryFrom, fmt, io::SeekFrom};

use async_std::io::{prelude::*, BufRead, Seek};
use itertools::Itertools;
use tracing::debug;

use crate::{error::Error, Result};

/// The byte used to terminate lines
pub const TERMINATOR: u8 = b'\n';

/// Location of a single line within the source. The terminator is not part of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub offset: u64,
    pub length: u64,
}

impl LineEntry {
    #[inline]
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Offset of the first byte after the line
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

impl From<(u64, u64)> for LineEntry {
    #[inline]
    fn from((offset, length): (u64, u64)) -> Self {
        Self::new(offset, length)
    }
}

/// Contains an in-memory line-index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTable {
    /// The index within the Vec represents the line-index in the file
    inner: Vec<LineEntry>,
}

impl LineTable {
    /// Create a new LineTable out of already built entries
    pub fn new(entries: Vec<LineEntry>) -> LineTable {
        Self { inner: entries }
    }

    /// Build a new table for text within `reader`. The reader gets rewound before and after
    /// scanning, so it can be reused for reading lines afterwards.
    pub async fn build<R: BufRead + Seek + Unpin>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0)).await?;

        let mut entries = Vec::new();
        let mut curr_offset: u64 = 0;

        let mut buff = Vec::with_capacity(1000);

        loop {
            buff.clear();
            let n = reader.read_until(TERMINATOR, &mut buff).await?;

            if n == 0 {
                break;
            }

            // Only the last line can come without a terminator
            let length = if buff.last() == Some(&TERMINATOR) {
                n - 1
            } else {
                n
            };

            entries.push(LineEntry::new(curr_offset, length as u64));
            curr_offset += n as u64;
        }

        reader.seek(SeekFrom::Start(0)).await?;

        let table = Self::new(entries);
        debug_assert!(table.is_contiguous());
        debug!(lines = table.len(), bytes = curr_offset, "built line table");
        Ok(table)
    }

    /// Build a table for data which is already in memory, eg. a mapped file.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut entries = Vec::new();
        let mut line_start = 0;

        for pos in memchr::memchr_iter(TERMINATOR, data) {
            entries.push(LineEntry::new(
                line_start as u64,
                (pos - line_start) as u64,
            ));
            line_start = pos + 1;
        }

        if line_start < data.len() {
            entries.push(LineEntry::new(
                line_start as u64,
                (data.len() - line_start) as u64,
            ));
        }

        let table = Self::new(entries);
        debug_assert!(table.is_contiguous());
        debug!(lines = table.len(), bytes = data.len(), "built line table");
        table
    }

    /// Get the entry at `pos`, where 0 is the first line
    #[inline]
    pub fn get(&self, pos: usize) -> Result<LineEntry> {
        self.inner.get(pos).copied().ok_or(Error::OutOfBounds)
    }

    /// Get the entry of line `number`, counting from 1 like humans do.
    #[inline]
    pub fn line(&self, number: u64) -> Result<LineEntry> {
        let pos = number
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or(Error::OutOfBounds)?;
        self.get(pos)
    }

    /// Returns the amount of lines in the table
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the source has no lines at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &LineEntry> {
        self.inner.iter()
    }

    /// Returns `true` if every line starts one terminator byte after the previous line ended
    /// and the first line starts at 0.
    pub fn is_contiguous(&self) -> bool {
        let starts_at_zero = self.inner.first().map_or(true, |first| first.offset == 0);

        starts_at_zero
            && self
                .inner
                .iter()
                .tuple_windows()
                .all(|(prev, next)| prev.end() + 1 == next.offset)
    }

    /// Returns a value which renders the table for debugging purposes
    #[inline]
    pub fn display(&self) -> DebugTable<'_> {
        DebugTable(self)
    }
}

/// Human readable rendering of a `LineTable` with one row per line
pub struct DebugTable<'a>(&'a LineTable);

impl fmt::Display for DebugTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Line | Offset | Length")?;
        writeln!(f, "------|--------|-------")?;
        for (i, entry) in self.0.iter().enumerate() {
            writeln!(f, "{:5} | {:6} | {:6}", i + 1, entry.offset, entry.length)?;
        }
        writeln!(f)?;
        writeln!(f, "Total lines: {}", self.0.len())
    }
}
