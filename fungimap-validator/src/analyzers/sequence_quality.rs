//! Sequence quality from quality-control report archives
//!
//! The archive holds `{acc}_fastqc/fastqc_data.txt`, a text report whose
//! basic-statistics block carries `Total Sequences` and `%GC` lines, followed
//! by a per-base quality table:
//!
//! ```text
//! >>Per base sequence quality	pass
//! #Base	Mean	Median	Lower Quartile	Upper Quartile	10th Percentile	90th Percentile
//! 1	32.5	33.0	31.0	34.0	30.0	34.0
//! >>END_MODULE
//! ```
//!
//! Sequences are paired-end, so read pairs are half the total sequence count.

use super::{Analysis, ReportParseError};
use crate::store::ArtifactLayout;
use crate::types::SequenceQualityMetrics;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const REPORT_FILE_NAME: &str = "fastqc_data.txt";
const TOTAL_SEQUENCES: &str = "Total Sequences";
const GC_PERCENT: &str = "%GC";
const PER_BASE_QUALITY_MARKERS: [&str; 2] = [">>Per base sequence quality", "#Per base sequence quality"];
const END_MODULE: &str = ">>END_MODULE";

/// Extract read pairs, GC content and mean per-base quality from report text
///
/// Malformed rows in the per-base table are skipped; an unparsable total or
/// GC figure is an error.
pub fn parse_fastqc_data(text: &str) -> Result<SequenceQualityMetrics, ReportParseError> {
    let mut metrics = SequenceQualityMetrics {
        artifact_present: true,
        ..Default::default()
    };

    for (index, line) in text.lines().enumerate() {
        let line_no = index as u64 + 1;
        if line.starts_with(TOTAL_SEQUENCES) {
            let value = last_token(line);
            let total: u64 = value.parse().map_err(|_| ReportParseError::InvalidNumber {
                field: "Total Sequences",
                value: value.to_string(),
                line: line_no,
            })?;
            metrics.read_pairs = total / 2;
        } else if line.starts_with(GC_PERCENT) {
            let value = last_token(line);
            metrics.gc_content = value.parse().map_err(|_| ReportParseError::InvalidNumber {
                field: "%GC",
                value: value.to_string(),
                line: line_no,
            })?;
        }
    }

    let scores = per_base_means(text);
    if !scores.is_empty() {
        metrics.mean_quality = scores.iter().sum::<f64>() / scores.len() as f64;
    }

    Ok(metrics)
}

fn last_token(line: &str) -> &str {
    line.split_whitespace().last().unwrap_or("")
}

/// Mean-quality column of every well-formed per-base row
fn per_base_means(text: &str) -> Vec<f64> {
    let mut scores = Vec::new();
    let mut in_section = false;

    for line in text.lines() {
        if !in_section {
            in_section = PER_BASE_QUALITY_MARKERS.iter().any(|m| line.starts_with(m));
            continue;
        }
        if line.starts_with(END_MODULE) {
            break;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(mean) = line
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse::<f64>().ok())
        {
            scores.push(mean);
        }
    }

    scores
}

/// Read the report text out of an archive, `Ok(None)` if the archive is absent
pub fn read_quality_archive(
    path: &Path,
    accession: &str,
) -> Result<Option<String>, ReportParseError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut archive = zip::ZipArchive::new(file)?;

    // Prefer the conventional entry; fall back to any report in the archive
    let expected = format!("{accession}_fastqc/{REPORT_FILE_NAME}");
    let entry_name = if archive.file_names().any(|name| name == expected) {
        expected
    } else {
        archive
            .file_names()
            .find(|name| name.ends_with(REPORT_FILE_NAME))
            .map(str::to_string)
            .ok_or_else(|| ReportParseError::MissingEntry(format!("archive has no {expected}")))?
    };

    let mut entry = archive.by_name(&entry_name)?;
    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(Some(String::from_utf8_lossy(&content).into_owned()))
}

/// Reads the quality-control archive of one accession
#[derive(Debug, Clone)]
pub struct SequenceQualityAnalyzer {
    layout: ArtifactLayout,
}

impl SequenceQualityAnalyzer {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Analyze the archive for `accession`
    ///
    /// Never fails; absent or unreadable archives yield zero metrics with
    /// `artifact_present = false`.
    pub async fn analyze(&self, accession: &str) -> Analysis<SequenceQualityMetrics> {
        let path = self.layout.quality_archive_path(accession);

        match Self::load(path, accession.to_string()).await {
            Ok(Some(metrics)) => {
                debug!(
                    accession = %accession,
                    read_pairs = metrics.read_pairs,
                    gc_content = metrics.gc_content,
                    mean_quality = metrics.mean_quality,
                    "Sequence quality analyzed"
                );
                Analysis::complete(metrics)
            }
            Ok(None) => {
                warn!(accession = %accession, "Quality-control archive not found");
                Analysis::degraded(
                    SequenceQualityMetrics::default(),
                    format!("Quality-control archive not found for {accession}"),
                )
            }
            Err(e) => {
                warn!(accession = %accession, error = %e, "Cannot process quality-control archive");
                Analysis::degraded(
                    SequenceQualityMetrics::default(),
                    format!("Quality-control archive unreadable for {accession}: {e}"),
                )
            }
        }
    }

    async fn load(
        path: PathBuf,
        accession: String,
    ) -> Result<Option<SequenceQualityMetrics>, ReportParseError> {
        // Archive decoding is blocking work
        tokio::task::spawn_blocking(move || {
            read_quality_archive(&path, &accession)?
                .map(|text| parse_fastqc_data(&text))
                .transpose()
        })
        .await?
    }
}
