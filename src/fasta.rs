//! FASTA reference ingestion (§4.0), with transparent gzip detection.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::bufread::GzDecoder;

use crate::error::BuildError;
use crate::reference::{ContigFlags, ContigInput, MethylationMode};

#[derive(Debug, Clone)]
pub struct ContigRecord {
    pub name: String,
    pub bases: Vec<u8>,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read a (optionally gzip-compressed) multi-FASTA file into one record
/// per `>` header, concatenating wrapped sequence lines.
pub fn read_fasta(path: &Path) -> Result<Vec<ContigRecord>, BuildError> {
    let file = File::open(path)
        .map_err(|e| BuildError::Input(format!("cannot open {}: {e}", path.display())))?;
    let mut buffered = BufReader::new(file);
    let mut magic = [0u8; 2];
    let is_gzip = buffered.fill_buf().map(|b| b.len() >= 2 && b[0..2] == GZIP_MAGIC).unwrap_or(false);
    let _ = magic;

    let text: Box<dyn BufRead> = if is_gzip {
        Box::new(BufReader::new(GzDecoder::new(buffered)))
    } else {
        Box::new(buffered)
    };

    parse_fasta(text, path)
}

fn parse_fasta(reader: Box<dyn BufRead>, path: &Path) -> Result<Vec<ContigRecord>, BuildError> {
    let mut records = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_bases: Vec<u8> = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| BuildError::Input(format!("reading {}: {e}", path.display())))?;
        if let Some(name) = line.strip_prefix('>') {
            if let Some(prev_name) = current_name.take() {
                records.push(ContigRecord { name: prev_name, bases: std::mem::take(&mut current_bases) });
            }
            current_name = Some(name.split_whitespace().next().unwrap_or("").to_string());
        } else {
            current_bases.extend(line.trim_end().bytes());
        }
    }
    if let Some(name) = current_name {
        records.push(ContigRecord { name, bases: current_bases });
    }

    if records.is_empty() {
        return Err(BuildError::Input(format!("{} contains no FASTA records", path.display())));
    }
    Ok(records)
}

/// Build `ContigInput`s from parsed FASTA records, applying uniform flags
/// and methylation mode (per-contig overrides are layered in by the
/// driver from `--ht-alt-liftover` and decoy-list inputs).
pub fn to_contig_inputs(records: Vec<ContigRecord>, flags: ContigFlags, methylation: MethylationMode) -> Vec<ContigInput> {
    records
        .into_iter()
        .map(|r| ContigInput { name: r.name, bases: r.bases, flags, methylation, mask_ranges: Vec::new() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_multi_record_fasta() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, ">chr1 some description\nACGT\nACGT\n>chr2\nTTTT").unwrap();
        let records = read_fasta(f.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "chr1");
        assert_eq!(records[0].bases, b"ACGTACGT");
        assert_eq!(records[1].bases, b"TTTT");
    }

    #[test]
    fn empty_file_is_an_input_error() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert!(read_fasta(f.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let result = read_fasta(Path::new("/nonexistent/path.fa"));
        assert!(matches!(result, Err(BuildError::Input(_))));
    }
}
