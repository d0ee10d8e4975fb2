//! Sequence database index (spec.md §1 lists "index/cache files over the
//! sequence database" as an explicitly out-of-scope collaborator). This is
//! the minimal concrete seam the engine needs from it: each replicon's size
//! and topology, derived from FASTA headers (spec.md §6.1).

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use memmap2::Mmap;

use crate::err::IoError;
use crate::replicon::{gembase_replicon_name, Replicon, Topology};

/// Scan a FASTA sequence database's headers to discover each replicon's
/// size. Memory-maps the file when it is not gzip-compressed (spec.md §5:
/// "memory-mapped if available; otherwise read sequentially").
pub fn discover_replicons(
    sequence_db: &Path,
    db_type: &str,
    topology_file: Option<&Path>,
) -> Result<Vec<Replicon>, IoError> {
    let mut counts: HashMap<String, u32> = HashMap::new();

    for header in read_headers(sequence_db)? {
        let protein_id = header.split_whitespace().next().unwrap_or("");
        let replicon_name = match db_type {
            "gembase" => gembase_replicon_name(protein_id).unwrap_or(protein_id).to_string(),
            _ => sequence_db
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("replicon")
                .to_string(),
        };
        *counts.entry(replicon_name).or_insert(0) += 1;
    }

    let topologies = topology_file.map(read_topology_file).transpose()?.unwrap_or_default();

    let mut replicons: Vec<Replicon> = counts
        .into_iter()
        .map(|(name, size)| {
            let topology = topologies.get(&name).copied().unwrap_or(Topology::Linear);
            Replicon::new(name, size, topology)
        })
        .collect();
    replicons.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(replicons)
}

fn read_headers(path: &Path) -> Result<Vec<String>, IoError> {
    let file = std::fs::File::open(path).map_err(|source| IoError::UnreadableReport {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let reader = std::io::BufReader::new(flate2::bufread::MultiGzDecoder::new(std::io::BufReader::new(file)));
        return collect_headers(reader, path);
    }

    // The mapping is read-only and dropped at the end of this call; nothing
    // else in the process writes to `path` concurrently.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| IoError::UnreadableReport {
        path: path.to_path_buf(),
        source,
    })?;
    collect_headers(mmap.as_ref(), path)
}

fn collect_headers(reader: impl BufRead, path: &Path) -> Result<Vec<String>, IoError> {
    let mut headers = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|source| IoError::UnreadableReport {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(header) = line.strip_prefix('>') {
            headers.push(header.to_string());
        }
    }
    Ok(headers)
}

fn read_topology_file(path: &Path) -> Result<HashMap<String, Topology>, IoError> {
    let text = std::fs::read_to_string(path).map_err(|source| IoError::UnreadableReport {
        path: path.to_path_buf(),
        source,
    })?;
    let mut topologies = HashMap::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(replicon), Some(kind)) = (fields.next(), fields.next()) else {
            return Err(IoError::MalformedRecord {
                path: path.to_path_buf(),
                line: idx + 1,
                detail: "expected `<replicon>\\t<linear|circular>`".to_string(),
            });
        };
        let topology = match kind {
            "linear" => Topology::Linear,
            "circular" => Topology::Circular,
            other => {
                return Err(IoError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    detail: format!("unknown topology {other:?}"),
                })
            }
        };
        topologies.insert(replicon.to_string(), topology);
    }
    Ok(topologies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gembase_headers_are_grouped_by_replicon_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.fasta");
        std::fs::write(
            &path,
            ">NC_000913_00001 hypothetical\nMKV\n>NC_000913_00002 hypothetical\nMKV\n>NC_000001_00001 other\nMKV\n",
        )
        .unwrap();

        let replicons = discover_replicons(&path, "gembase", None).unwrap();
        assert_eq!(2, replicons.len());
        let first = replicons.iter().find(|r| r.name == "NC_000001").unwrap();
        assert_eq!(1, first.size);
        let second = replicons.iter().find(|r| r.name == "NC_000913").unwrap();
        assert_eq!(2, second.size);
    }

    #[test]
    fn topology_file_overrides_the_linear_default() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = dir.path().join("db.fasta");
        std::fs::write(&fasta, ">chr_00001 desc\nMKV\n").unwrap();
        let topo = dir.path().join("topology.tsv");
        std::fs::write(&topo, "chr\tcircular\n").unwrap();

        let replicons = discover_replicons(&fasta, "gembase", Some(&topo)).unwrap();
        assert_eq!(Topology::Circular, replicons[0].topology);
    }

    #[test]
    fn malformed_topology_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let topo = dir.path().join("topology.tsv");
        std::fs::write(&topo, "chr\tnot-a-topology\n").unwrap();
        let err = read_topology_file(&topo).unwrap_err();
        assert!(matches!(err, IoError::MalformedRecord { .. }));
    }
}
