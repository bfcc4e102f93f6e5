//! Key-value run reader
//!
//! Turns a key-sorted temporary file into a lazy, forward-only sequence of
//! [`RunEntry`] values: one key, a block of its values, and the block index.
//!
//! # Blocking
//!
//! Consecutive lines with the same key are accumulated. A block is emitted
//! when the key changes, at end of file, or when another value for the same
//! key arrives while the current block already holds `block_size` values.
//! Consequently:
//!
//! - a key with at most `block_size` values yields exactly one block, index 0
//! - a key needing N continuations yields blocks 0..=N, every block but the
//!   last holding exactly `block_size` values
//! - `is_last` tells the consumer, before it acts on a block, whether more
//!   blocks of the same key follow
//!
//! The file is read line by line; only the current block is held in memory.

use hyperload_core::{Error, FieldLayout, Result, ValueEntry};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::writer::FIELD_DELIMITER;

/// One grouped block of values for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    /// Record key
    pub key: String,
    /// Values in file order
    pub values: Vec<ValueEntry>,
    /// 0 for the first block of a key, then 1, 2, ...
    pub block: usize,
    /// No further block follows for this key
    pub is_last: bool,
}

impl RunEntry {
    /// True when the whole value set of the key is in this one block
    pub fn is_single_block(&self) -> bool {
        self.block == 0 && self.is_last
    }
}

/// Lazy iterator over the grouped runs of a sorted file
pub struct KeyValueRuns {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    layout: FieldLayout,
    block_size: usize,
    line_no: u64,
    current_key: Option<String>,
    pending: Vec<ValueEntry>,
    block: usize,
    done: bool,
}

impl KeyValueRuns {
    /// Open `path` for reading with the given layout and block threshold
    pub fn open(path: impl AsRef<Path>, layout: FieldLayout, block_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            layout,
            block_size: block_size.max(1),
            line_no: 0,
            current_key: None,
            pending: Vec::new(),
            block: 0,
            done: false,
        })
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedRecord {
            path: self.path.clone(),
            line: self.line_no,
            reason: reason.into(),
        }
    }

    /// Next non-empty line split into key and value
    fn next_record(&mut self) -> Option<Result<(String, ValueEntry)>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            return Some(self.parse(line));
        }
    }

    fn parse(&self, line: &str) -> Result<(String, ValueEntry)> {
        let (key, rest) = line
            .split_once(FIELD_DELIMITER)
            .ok_or_else(|| self.malformed("missing value field"))?;
        if key.is_empty() {
            return Err(self.malformed("empty key"));
        }

        let value = match self.layout {
            FieldLayout::Pair => {
                if rest.contains(FIELD_DELIMITER) {
                    return Err(self.malformed("expected exactly two fields"));
                }
                ValueEntry::Token(rest.to_string())
            }
            FieldLayout::MergeRest => ValueEntry::Token(rest.to_string()),
            FieldLayout::Targets => {
                let mut fields = rest.split(FIELD_DELIMITER);
                let head = fields.next().unwrap_or_default().to_string();
                ValueEntry::Targeted {
                    head,
                    targets: fields.map(str::to_string).collect(),
                }
            }
        };
        Ok((key.to_string(), value))
    }

    fn take_block(&mut self, key: String, is_last: bool) -> RunEntry {
        RunEntry {
            key,
            values: std::mem::take(&mut self.pending),
            block: self.block,
            is_last,
        }
    }
}

impl Iterator for KeyValueRuns {
    type Item = Result<RunEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (key, value) = match self.next_record() {
                None => {
                    self.done = true;
                    let key = self.current_key.take()?;
                    return Some(Ok(self.take_block(key, true)));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(record)) => record,
            };

            match self.current_key.as_deref() {
                Some(current) if current == key => {
                    if self.pending.len() >= self.block_size {
                        let full = self.take_block(key, false);
                        self.block += 1;
                        self.pending.push(value);
                        return Some(Ok(full));
                    }
                    self.pending.push(value);
                }
                Some(current) if current.as_bytes() > key.as_bytes() => {
                    self.done = true;
                    let reason = format!("key {:?} after {:?}: file is not sorted", key, current);
                    return Some(Err(self.malformed(reason)));
                }
                _ => {
                    let previous = self.current_key.replace(key);
                    let block = previous.map(|prev| self.take_block(prev, true));
                    self.block = 0;
                    self.pending.push(value);
                    if let Some(block) = block {
                        return Some(Ok(block));
                    }
                }
            }
        }
    }
}
