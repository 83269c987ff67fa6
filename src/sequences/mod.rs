//! Protein sequence input
//!
//! Reads FASTA, filters by length, removes duplicate ids and writes the
//! filtered set to a temporary file for the search tool.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};
use tracing::info;

/// Residues per line when writing FASTA
const LINE_WIDTH: usize = 60;

/// Default minimum protein length
pub const DEFAULT_MIN_LENGTH: usize = 50;

/// A single protein sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Header text up to the first whitespace
    pub id: String,
    /// Full header line without the leading `>`
    pub description: String,
    /// Residues, whitespace removed
    pub residues: String,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// Summary statistics of a sequence set
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStats {
    pub count: usize,
    pub avg_length: f64,
    pub min_length: usize,
    pub max_length: usize,
}

/// Parse FASTA records from a reader. Text before the first header is ignored.
pub fn parse_fasta<R: BufRead>(reader: R) -> std::io::Result<Vec<Sequence>> {
    let mut sequences = Vec::new();
    let mut current: Option<Sequence> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();

        if let Some(header) = line.strip_prefix('>') {
            if let Some(seq) = current.take() {
                sequences.push(seq);
            }
            let header = header.trim();
            current = Some(Sequence {
                id: header.split_whitespace().next().unwrap_or_default().to_string(),
                description: header.to_string(),
                residues: String::new(),
            });
        } else if let Some(seq) = current.as_mut() {
            seq.residues
                .extend(line.chars().filter(|c| !c.is_whitespace()));
        }
    }

    if let Some(seq) = current {
        sequences.push(seq);
    }

    Ok(sequences)
}

/// Loaded protein set
#[derive(Debug, Clone, Default)]
pub struct SequenceSet {
    sequences: Vec<Sequence>,
}

impl SequenceSet {
    /// Read a FASTA file. A missing file is a configuration error.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let sequences = parse_fasta(BufReader::new(file)).map_err(|e| Error::io(path, e))?;
        info!("Loaded {} sequences from {}", sequences.len(), path.display());
        Ok(Self { sequences })
    }

    pub fn from_sequences(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Drop sequences shorter than `min_length`, returning how many were removed
    pub fn filter_min_length(&mut self, min_length: usize) -> usize {
        let before = self.sequences.len();
        self.sequences.retain(|s| s.len() >= min_length);
        let removed = before - self.sequences.len();
        info!(
            "Filtered out {} sequences shorter than {} residues",
            removed, min_length
        );
        removed
    }

    /// Keep the first occurrence of each id, returning how many were removed
    pub fn dedup_ids(&mut self) -> usize {
        let before = self.sequences.len();
        let mut seen = HashSet::new();
        self.sequences.retain(|s| seen.insert(s.id.clone()));
        let removed = before - self.sequences.len();
        if removed > 0 {
            info!("Removed {} duplicate sequences", removed);
        }
        removed
    }

    pub fn stats(&self) -> SequenceStats {
        let count = self.sequences.len();
        let total: usize = self.sequences.iter().map(Sequence::len).sum();
        SequenceStats {
            count,
            avg_length: if count == 0 { 0.0 } else { total as f64 / count as f64 },
            min_length: self.sequences.iter().map(Sequence::len).min().unwrap_or(0),
            max_length: self.sequences.iter().map(Sequence::len).max().unwrap_or(0),
        }
    }

    /// Write all sequences as FASTA
    pub fn write_fasta<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for seq in &self.sequences {
            writeln!(writer, ">{}", seq.description)?;
            for chunk in seq.residues.as_bytes().chunks(LINE_WIDTH) {
                writer.write_all(chunk)?;
                writer.write_all(b"\n")?;
            }
        }
        writer.flush()
    }

    /// Write to a temporary FASTA file, deleted when the returned path drops
    pub fn write_temp(&self) -> Result<TempPath> {
        let file = tempfile::Builder::new()
            .prefix("cas-typer-")
            .suffix(".fasta")
            .tempfile()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        self.write_to(file)
    }

    fn write_to(&self, mut file: NamedTempFile) -> Result<TempPath> {
        self.write_fasta(std::io::BufWriter::new(file.as_file_mut()))
            .map_err(|e| Error::io(file.path(), e))?;
        info!(
            "Wrote {} sequences to {}",
            self.sequences.len(),
            file.path().display()
        );
        Ok(file.into_temp_path())
    }
}
