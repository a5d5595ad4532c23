// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Streaming reader over a line-oriented geodesic word list.
//!
//! The enumeration holds tens of millions of lines grouped by word length, so
//! it is never loaded whole: [`WordSource`] skips to the first requested line
//! and hands out bounded chunks of parsed [`Word`]s.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SpacedError, SpacedResult};
use crate::word::Word;

pub const DEFAULT_CHUNK_SIZE: usize = 65_536;

/// Half-open range of line indices holding words of one length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthGroup {
    pub length: usize,
    pub start: usize,
    pub end: usize,
}

impl LengthGroup {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lines `start..end` of the enumeration; `end = None` reads to EOF.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WordRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl WordRange {
    pub fn new(start: usize, end: Option<usize>) -> SpacedResult<Self> {
        if let Some(end) = end {
            if end < start {
                return Err(SpacedError::InvalidRange { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn all() -> Self {
        Self::default()
    }
}

impl From<LengthGroup> for WordRange {
    fn from(group: LengthGroup) -> Self {
        Self {
            start: group.start,
            end: Some(group.end),
        }
    }
}

/// Chunked iterator of words over any buffered reader.
pub struct WordSource<R> {
    reader: R,
    origin: PathBuf,
    range: WordRange,
    chunk_size: usize,
    /// Lines consumed so far, i.e. the 1-based number of the current line.
    line: usize,
    skipped: bool,
    buf: String,
}

impl WordSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, range: WordRange, chunk_size: usize) -> SpacedResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| SpacedError::io(path, err))?;
        Ok(Self::with_origin(BufReader::new(file), path, range, chunk_size))
    }
}

impl WordSource<Cursor<Vec<u8>>> {
    /// In-memory enumeration, one word per entry.
    pub fn from_lines<S: AsRef<str>>(lines: &[S], range: WordRange, chunk_size: usize) -> Self {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        Self::with_origin(Cursor::new(text.into_bytes()), "<memory>", range, chunk_size)
    }
}

impl<R: BufRead> WordSource<R> {
    pub fn new(reader: R, range: WordRange, chunk_size: usize) -> Self {
        Self::with_origin(reader, "<reader>", range, chunk_size)
    }

    fn with_origin(
        reader: R,
        origin: impl Into<PathBuf>,
        range: WordRange,
        chunk_size: usize,
    ) -> Self {
        Self {
            reader,
            origin: origin.into(),
            range,
            chunk_size: chunk_size.max(1),
            line: 0,
            skipped: false,
            buf: String::new(),
        }
    }

    /// Reads one line into `buf` with its terminator stripped.
    /// `Ok(false)` means EOF.
    fn read_line(&mut self) -> SpacedResult<bool> {
        self.buf.clear();
        let read = self
            .reader
            .read_line(&mut self.buf)
            .map_err(|err| SpacedError::io(&self.origin, err))?;
        if read == 0 {
            return Ok(false);
        }
        let trimmed = self.buf.trim_end_matches(&['\n', '\r'][..]).len();
        self.buf.truncate(trimmed);
        self.line += 1;
        Ok(true)
    }

    fn skip_to_start(&mut self) -> SpacedResult<()> {
        while self.line < self.range.start {
            if !self.read_line()? {
                break;
            }
        }
        self.skipped = true;
        debug!(origin = ?self.origin, start = self.range.start, "enumeration positioned");
        Ok(())
    }

    fn exhausted(&self) -> bool {
        self.range.end.is_some_and(|end| self.line >= end)
    }

    fn next_chunk(&mut self) -> SpacedResult<Vec<Word>> {
        if !self.skipped {
            self.skip_to_start()?;
        }
        let mut chunk = Vec::with_capacity(self.chunk_size.min(DEFAULT_CHUNK_SIZE));
        while chunk.len() < self.chunk_size && !self.exhausted() {
            if !self.read_line()? {
                break;
            }
            if self.buf.is_empty() {
                continue;
            }
            let line = self.line;
            let word = Word::parse(&self.buf).map_err(|err| match err {
                SpacedError::InvalidSymbol {
                    symbol, position, ..
                } => SpacedError::InvalidSymbol {
                    symbol,
                    position,
                    line: Some(line),
                },
                other => other,
            })?;
            chunk.push(word);
        }
        Ok(chunk)
    }
}

impl<R: BufRead> Iterator for WordSource<R> {
    type Item = SpacedResult<Vec<Word>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(chunk) if chunk.is_empty() => None,
            other => Some(other),
        }
    }
}

/// Reports every maximal run of consecutive lines sharing a word length.
/// Blank lines are skipped and do not break a run.
pub fn scan_length_groups<R: BufRead>(reader: R) -> SpacedResult<Vec<LengthGroup>> {
    scan_with_origin(reader, Path::new("<reader>"))
}

pub fn scan_length_groups_in(path: impl AsRef<Path>) -> SpacedResult<Vec<LengthGroup>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| SpacedError::io(path, err))?;
    scan_with_origin(BufReader::new(file), path)
}

fn scan_with_origin<R: BufRead>(reader: R, origin: &Path) -> SpacedResult<Vec<LengthGroup>> {
    let mut groups: Vec<LengthGroup> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| SpacedError::io(origin, err))?;
        let length = line.trim_end_matches('\r').chars().count();
        if length == 0 {
            continue;
        }
        match groups.last_mut() {
            Some(group) if group.length == length => group.end = index + 1,
            _ => groups.push(LengthGroup {
                length,
                start: index,
                end: index + 1,
            }),
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: WordSource<Cursor<Vec<u8>>>) -> Vec<String> {
        source
            .flat_map(|chunk| chunk.unwrap())
            .map(|word| word.to_string())
            .collect()
    }

    #[test]
    fn streams_the_requested_slice_in_bounded_chunks() {
        let lines = ["a", "b", "ab", "cd", "AB", "CD", "abc"];
        let range = WordRange::new(2, Some(6)).unwrap();
        let mut source = WordSource::from_lines(&lines, range, 3);
        assert_eq!(source.next().unwrap().unwrap().len(), 3);
        assert_eq!(source.next().unwrap().unwrap().len(), 1);
        assert!(source.next().is_none());

        let source = WordSource::from_lines(&lines, range, 3);
        assert_eq!(collect(source), ["ab", "cd", "AB", "CD"]);
    }

    #[test]
    fn open_range_reads_to_eof_and_tolerates_crlf() {
        let reader = Cursor::new(b"ab\r\ncd\r\n\r\n".to_vec());
        let words: Vec<String> = WordSource::new(reader, WordRange::all(), 16)
            .flat_map(|chunk| chunk.unwrap())
            .map(|word| word.to_string())
            .collect();
        assert_eq!(words, ["ab", "cd"]);
    }

    #[test]
    fn invalid_symbol_reports_its_line() {
        let lines = ["ab", "cd", "a?"];
        let mut source = WordSource::from_lines(&lines, WordRange::all(), 8);
        match source.next() {
            Some(Err(SpacedError::InvalidSymbol {
                symbol,
                position,
                line,
            })) => {
                assert_eq!(symbol, '?');
                assert_eq!(position, 1);
                assert_eq!(line, Some(3));
            }
            other => panic!("expected invalid symbol, got {other:?}"),
        }
    }

    #[test]
    fn start_past_eof_is_empty() {
        let source = WordSource::from_lines(&["ab"], WordRange::new(5, None).unwrap(), 8);
        assert!(collect(source).is_empty());
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(matches!(
            WordRange::new(4, Some(2)),
            Err(SpacedError::InvalidRange { start: 4, end: 2 })
        ));
    }

    #[test]
    fn scan_finds_contiguous_length_runs() {
        let text = "a\nb\nab\ncd\nDA\nabc\n\n";
        let groups = scan_length_groups(Cursor::new(text)).unwrap();
        assert_eq!(
            groups,
            [
                LengthGroup { length: 1, start: 0, end: 2 },
                LengthGroup { length: 2, start: 2, end: 5 },
                LengthGroup { length: 3, start: 5, end: 6 },
            ]
        );
        assert_eq!(groups[1].len(), 3);
        let range = WordRange::from(groups[1]);
        let lines: Vec<&str> = text.lines().collect();
        let source = WordSource::from_lines(lines.as_slice(), range, 2);
        assert_eq!(collect(source), ["ab", "cd", "DA"]);
    }
}
