//! Append-only record writer for temporary files
//!
//! Each line is `key,value` or `key,value,target...`. Multi-token keys are
//! reduced to one token with the composite hasher before writing, and list
//! values are comma-joined. Nothing beyond the `BufWriter` buffer is held in
//! memory, so memory use per record is constant regardless of file size.
//!
//! The format has no escaping. Keys and list elements are content hashes and
//! must not contain a comma or a line break; the writer rejects them rather
//! than produce a file whose record boundaries are wrong. Free-text values
//! written with [`RecordWriter::write`] may contain commas (they are read back
//! with the merge-rest layout) but never line breaks.

use hyperload_core::{CompositeHasher, Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Field delimiter
pub const FIELD_DELIMITER: char = ',';

/// Writer for one collection's temporary file
pub struct RecordWriter {
    path: PathBuf,
    out: BufWriter<File>,
    hasher: Arc<dyn CompositeHasher>,
    records: u64,
}

impl RecordWriter {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl AsRef<Path>, hasher: Arc<dyn CompositeHasher>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
            hasher,
            records: 0,
        })
    }

    /// Append `key,value` where `value` is free text.
    pub fn write(&mut self, key: &str, value: &str) -> Result<()> {
        check_token(key)?;
        check_line(value)?;
        writeln!(self.out, "{}{}{}", key, FIELD_DELIMITER, value)?;
        self.records += 1;
        Ok(())
    }

    /// Append a record with a possibly composite key and a list value.
    ///
    /// A key of more than one token is replaced by its composite hash; the
    /// value tokens are comma-joined.
    pub fn write_record(&mut self, key: &[&str], values: &[&str]) -> Result<()> {
        let key = match key {
            [single] => {
                check_token(single)?;
                (*single).to_string()
            }
            parts => {
                for part in parts {
                    check_line(part)?;
                }
                self.hasher.composite_hash(parts)
            }
        };
        check_token(&key)?;
        if values.is_empty() {
            return Err(Error::InvalidToken {
                token: key,
                reason: "record has no value",
            });
        }

        self.out.write_all(key.as_bytes())?;
        for value in values {
            check_token(value)?;
            write!(self.out, "{}{}", FIELD_DELIMITER, value)?;
        }
        self.out.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    /// Records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Path being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and sync the file; returns the number of records written
    pub fn finish(mut self) -> Result<u64> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(self.records)
    }
}

fn check_line(token: &str) -> Result<()> {
    if token.contains(['\n', '\r']) {
        return Err(Error::InvalidToken {
            token: token.to_string(),
            reason: "contains a line break",
        });
    }
    Ok(())
}

fn check_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::InvalidToken {
            token: String::new(),
            reason: "empty token",
        });
    }
    if token.contains(FIELD_DELIMITER) {
        return Err(Error::InvalidToken {
            token: token.to_string(),
            reason: "contains the field delimiter",
        });
    }
    check_line(token)
}
