//! Reader for a per-gene HMM raw report (spec.md §4.2 step 1), transparently
//! gzip-decoding, grounded directly on the teacher's
//! `common::io::open_read_maybe_gz`.

use std::io::BufRead;
use std::path::Path;

use flate2::bufread::MultiGzDecoder;

use crate::err::IoError;
use crate::model::CoreGeneId;

use super::record::Hit;

/// Transparently open a file with a gzip decoder if its extension is `.gz`.
fn open_read_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, IoError> {
    let file = std::fs::File::open(path).map_err(|source| IoError::UnreadableReport {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(std::io::BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Parse one gene's HMM report: one record per line, tab- or
/// whitespace-separated, columns in the order of spec.md §3's `Hit` fields
/// (minus `core_gene`, which is supplied by the caller since a report file
/// covers exactly one gene):
///
/// `replicon position protein_id i_evalue score profile_coverage
/// sequence_coverage seq_length match_begin match_end`
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_report(path: &Path, core_gene: CoreGeneId) -> Result<Vec<Hit>, IoError> {
    let reader = open_read_maybe_gz(path)?;
    let mut hits = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| {
            if source.kind() == std::io::ErrorKind::InvalidData {
                IoError::CorruptGzip {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                IoError::UnreadableReport {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 10 {
            return Err(IoError::MalformedRecord {
                path: path.to_path_buf(),
                line: idx + 1,
                detail: format!("expected 10 columns, got {}", fields.len()),
            });
        }

        let malformed = |detail: String| IoError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx + 1,
            detail,
        };
        let parse_u32 = |s: &str| s.parse::<u32>().map_err(|e| malformed(e.to_string()));
        let parse_f64 = |s: &str| s.parse::<f64>().map_err(|e| malformed(e.to_string()));

        hits.push(Hit {
            replicon: fields[0].to_string(),
            position: parse_u32(fields[1])?,
            protein_id: fields[2].to_string(),
            core_gene,
            i_evalue: parse_f64(fields[3])?,
            score: parse_f64(fields[4])?,
            profile_coverage: parse_f64(fields[5])?,
            sequence_coverage: parse_f64(fields[6])?,
            seq_length: parse_u32(fields[7])?,
            match_begin: parse_u32(fields[8])?,
            match_end: parse_u32(fields[9])?,
        });
    }

    Ok(hits)
}
