//! External sort of temporary files by their first field
//!
//! Implements the classic two-phase external sort:
//!
//! 1. **Run generation**: read up to `run_lines` lines, stable-sort them by
//!    key, spill each run to a private spill directory
//! 2. **Merge**: k-way merge of the runs through a min-heap, ties broken by
//!    run index so records with equal keys keep their input order
//!
//! Output goes to `{path}.sorted`, is synced, then renamed over `path`, so a
//! reader never observes a partially sorted file. Input that fits in one run
//! skips the spill and merge entirely.

use hyperload_core::Result;
use rayon::slice::ParallelSliceMut;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::files::sorted_sibling;
use crate::writer::FIELD_DELIMITER;

/// Default number of lines held in memory per run
pub const DEFAULT_RUN_LINES: usize = 1_000_000;

/// Capability to sort a temporary file in place by its first field
pub trait ExternalSorter: Send + Sync {
    /// Sort `path` by first comma field, stable, replacing the file atomically
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading, spilling, or renaming fails; the
    /// original file is left untouched in that case.
    fn sort_by_first_field(&self, path: &Path) -> Result<SortStats>;
}

/// Outcome of one sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortStats {
    /// Non-empty lines sorted
    pub lines: u64,
    /// Runs spilled to disk (0 when the input fit in memory)
    pub runs: usize,
}

/// First field of a record line
#[inline]
pub fn first_field(line: &str) -> &str {
    match line.find(FIELD_DELIMITER) {
        Some(i) => &line[..i],
        None => line,
    }
}

#[inline]
fn cmp_first_field(a: &str, b: &str) -> Ordering {
    first_field(a).as_bytes().cmp(first_field(b).as_bytes())
}

/// Disk-backed merge sort
#[derive(Debug, Clone)]
pub struct MergeSorter {
    run_lines: usize,
    spill_dir: Option<PathBuf>,
}

impl Default for MergeSorter {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_LINES)
    }
}

impl MergeSorter {
    /// Sorter holding at most `run_lines` lines in memory
    pub fn new(run_lines: usize) -> Self {
        Self {
            run_lines: run_lines.max(1),
            spill_dir: None,
        }
    }

    /// Spill runs under `dir` instead of next to the input file
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    fn spill_parent(&self, input: &Path) -> PathBuf {
        match (&self.spill_dir, input.parent()) {
            (Some(dir), _) => dir.clone(),
            (None, Some(parent)) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::temp_dir(),
        }
    }

    /// Read the next run of non-empty lines; an empty result means EOF
    fn read_run(&self, lines: &mut Lines<BufReader<File>>) -> Result<Vec<String>> {
        let mut run = Vec::with_capacity(self.run_lines.min(64 * 1024));
        while run.len() < self.run_lines {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    let line = line.trim_end_matches('\r');
                    if !line.is_empty() {
                        run.push(line.to_string());
                    }
                }
                None => break,
            }
        }
        // par_sort_by is a stable merge sort
        run.par_sort_by(|a, b| cmp_first_field(a, b));
        Ok(run)
    }
}

impl ExternalSorter for MergeSorter {
    fn sort_by_first_field(&self, path: &Path) -> Result<SortStats> {
        let start = Instant::now();
        let output = sorted_sibling(path);
        let mut lines = BufReader::new(File::open(path)?).lines();

        let first = self.read_run(&mut lines)?;
        let mut stats = SortStats {
            lines: first.len() as u64,
            runs: 0,
        };

        if first.len() < self.run_lines {
            write_lines(&output, first.iter().map(String::as_str))?;
        } else {
            let spill = tempfile::Builder::new()
                .prefix("hyperload-sort-")
                .tempdir_in(self.spill_parent(path))?;
            let mut run_paths = vec![spill_run(spill.path(), 0, &first)?];
            drop(first);
            loop {
                let run = self.read_run(&mut lines)?;
                if run.is_empty() {
                    break;
                }
                stats.lines += run.len() as u64;
                run_paths.push(spill_run(spill.path(), run_paths.len(), &run)?);
            }
            stats.runs = run_paths.len();
            debug!(target: "hyperload::sort", path = %path.display(), runs = stats.runs, "Merging sorted runs");
            merge_runs(&run_paths, &output)?;
        }

        fs::rename(&output, path)?;
        info!(
            target: "hyperload::sort",
            path = %path.display(),
            lines = stats.lines,
            runs = stats.runs,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "File sorted"
        );
        Ok(stats)
    }
}

fn write_lines<'a>(path: &Path, lines: impl Iterator<Item = &'a str>) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    for line in lines {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    out.get_ref().sync_all()?;
    Ok(())
}

fn spill_run(dir: &Path, index: usize, run: &[String]) -> Result<PathBuf> {
    let path = dir.join(format!("run-{:06}.txt", index));
    write_lines(&path, run.iter().map(String::as_str))?;
    Ok(path)
}

/// Heap entry: current line of one run
struct RunHead {
    line: String,
    run: usize,
}

impl Eq for RunHead {}

impl PartialEq for RunHead {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

// Reversed so BinaryHeap pops the smallest key, then the earliest run
impl Ord for RunHead {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_first_field(&other.line, &self.line).then(other.run.cmp(&self.run))
    }
}

impl PartialOrd for RunHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn merge_runs(runs: &[PathBuf], output: &Path) -> Result<()> {
    let mut readers = Vec::with_capacity(runs.len());
    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (run, path) in runs.iter().enumerate() {
        let mut lines = BufReader::new(File::open(path)?).lines();
        if let Some(line) = lines.next() {
            heap.push(RunHead { line: line?, run });
        }
        readers.push(lines);
    }

    let mut out = BufWriter::new(File::create(output)?);
    while let Some(RunHead { line, run }) = heap.pop() {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        if let Some(next) = readers[run].next() {
            heap.push(RunHead { line: next?, run });
        }
    }
    out.flush()?;
    out.get_ref().sync_all()?;
    Ok(())
}
