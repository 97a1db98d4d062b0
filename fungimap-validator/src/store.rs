//! Storage layout and the read-only metadata accessor
//!
//! Every artifact is located by a path convention keyed on accession:
//!
//! | Artifact                 | Path under the storage root              |
//! |--------------------------|------------------------------------------|
//! | metadata record          | `{acc}/metadata.json`                    |
//! | raw reads                | `{acc}/{acc}.fastq.gz`                   |
//! | classification report    | `eda/kraken2/{acc}_report.txt`           |
//! | species-abundance report | `eda/bracken/{acc}_bracken.txt`          |
//! | quality-control archive  | `eda/fastqc/{acc}_fastqc.zip`            |

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolves artifact paths under one storage root
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sample_dir(&self, accession: &str) -> PathBuf {
        self.root.join(accession)
    }

    pub fn metadata_path(&self, accession: &str) -> PathBuf {
        self.sample_dir(accession).join("metadata.json")
    }

    pub fn raw_reads_path(&self, accession: &str) -> PathBuf {
        self.sample_dir(accession)
            .join(format!("{accession}.fastq.gz"))
    }

    pub fn classification_report_path(&self, accession: &str) -> PathBuf {
        self.root
            .join("eda")
            .join("kraken2")
            .join(format!("{accession}_report.txt"))
    }

    pub fn abundance_report_path(&self, accession: &str) -> PathBuf {
        self.root
            .join("eda")
            .join("bracken")
            .join(format!("{accession}_bracken.txt"))
    }

    pub fn quality_archive_path(&self, accession: &str) -> PathBuf {
        self.root
            .join("eda")
            .join("fastqc")
            .join(format!("{accession}_fastqc.zip"))
    }
}

/// True if `accession` can be used as a single path component
///
/// Rejects empty strings, `.`/`..`, and anything containing a path separator
/// so an accession can never address files outside its own artifacts.
pub fn is_valid_accession(accession: &str) -> bool {
    !accession.trim().is_empty()
        && accession != "."
        && accession != ".."
        && !accession.contains(['/', '\\'])
}

/// Accession named by a command-line input
///
/// Raw read files (`.fastq`, `.fq`, optionally gzipped) and any input with a
/// directory component map to the file name up to its first `.`; anything
/// else is taken as an accession verbatim.
pub fn accession_from_input(input: &str) -> String {
    let input = input.trim();
    let is_read_file = [".fastq", ".fastq.gz", ".fq", ".fq.gz"]
        .iter()
        .any(|ext| input.ends_with(ext));
    let has_dir = input.contains(['/', '\\']);

    if !is_read_file && !has_dir {
        return input.to_string();
    }

    let file_name = Path::new(input)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(input);
    file_name
        .split('.')
        .next()
        .unwrap_or(file_name)
        .to_string()
}

/// Metadata record read failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed metadata JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("metadata in {path} is not a JSON object")]
    NotAnObject { path: PathBuf },
}

/// Read-only accessor for per-sample metadata records
#[derive(Debug, Clone)]
pub struct MetadataStore {
    layout: ArtifactLayout,
}

impl MetadataStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Whether a metadata record exists for `accession`
    pub async fn exists(&self, accession: &str) -> Result<bool, StoreError> {
        let path = self.layout.metadata_path(accession);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    /// Load the metadata record, `Ok(None)` if there is none
    pub async fn load(&self, accession: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let path = self.layout.metadata_path(accession);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(record)) => Ok(Some(record)),
            Ok(_) => Err(StoreError::NotAnObject { path }),
            Err(source) => Err(StoreError::Malformed { path, source }),
        }
    }
}
