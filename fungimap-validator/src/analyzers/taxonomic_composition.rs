//! Taxonomic composition from classification and species-abundance reports
//!
//! # Classification report
//! Tab-separated, six columns per row:
//! `percent, clade_reads, direct_reads, rank_code, taxid, name`.
//! Rows with any other column count are skipped. The unclassified row
//! (rank code `U`) provides the read total used as the percentage baseline;
//! the Fungi kingdom (taxid 4751) and Homo sapiens (taxid 9606) rows provide
//! the fungal and host read counts. When several rows match, the last wins.
//!
//! # Species-abundance report
//! Tab-separated with a header row and at least seven columns:
//! `name, taxid, rank_code, ..., fraction_total_reads` (fraction in column 7).
//! Only species rows (rank code `S`) are kept.

use super::{Analysis, ReportParseError};
use crate::store::ArtifactLayout;
use crate::types::TaxonomicMetrics;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, warn};

/// Rank code of the unclassified-reads row
pub const UNCLASSIFIED_RANK: &str = "U";
/// Rank code of species rows in the abundance report
pub const SPECIES_RANK: &str = "S";
/// NCBI taxonomy id of the Fungi kingdom
pub const FUNGI_TAXID: &str = "4751";
/// NCBI taxonomy id of Homo sapiens
pub const HUMAN_TAXID: &str = "9606";

const DOMINANT_SPECIES_LIMIT: usize = 5;
const ABUNDANCE_LIMIT: usize = 10;

/// Read counts extracted from a classification report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationCounts {
    pub total_reads: u64,
    pub fungal_reads: u64,
    pub host_reads: u64,
}

impl ClassificationCounts {
    /// Fungal reads as a percentage of the baseline, 0.0 when there is none
    pub fn fungal_signal(&self) -> f64 {
        percentage(self.fungal_reads, self.total_reads)
    }

    /// Host reads as a percentage of the baseline, 0.0 when there is none
    pub fn host_contamination(&self) -> f64 {
        percentage(self.host_reads, self.total_reads)
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn tab_reader<R: Read>(reader: R, has_headers: bool) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_headers)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Records of a report decoded as text; rows that are not UTF-8 are skipped
fn text_records<R: Read>(
    reader: csv::Reader<R>,
) -> impl Iterator<Item = Result<csv::StringRecord, csv::Error>> {
    reader
        .into_byte_records()
        .filter_map(|record| match record {
            Ok(bytes) => match csv::StringRecord::from_byte_record(bytes) {
                Ok(record) => Some(Ok(record)),
                Err(e) => {
                    debug!(error = %e, "Skipping report row that is not UTF-8");
                    None
                }
            },
            Err(e) => Some(Err(e)),
        })
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Parse a classification report into read counts
pub fn parse_classification_report<R: Read>(
    reader: R,
) -> Result<ClassificationCounts, ReportParseError> {
    let mut counts = ClassificationCounts::default();

    for record in text_records(tab_reader(reader, false)) {
        let record = record?;
        if record.len() != 6 {
            continue;
        }

        let rank = &record[3];
        let taxid = &record[4];
        let is_relevant = rank == UNCLASSIFIED_RANK || taxid == FUNGI_TAXID || taxid == HUMAN_TAXID;
        if !is_relevant {
            continue;
        }

        let clade_reads: u64 =
            record[1]
                .parse()
                .map_err(|_| ReportParseError::InvalidNumber {
                    field: "clade_reads",
                    value: record[1].to_string(),
                    line: record_line(&record),
                })?;

        if rank == UNCLASSIFIED_RANK {
            counts.total_reads = clade_reads;
        } else if taxid == FUNGI_TAXID {
            counts.fungal_reads = clade_reads;
        } else {
            counts.host_reads = clade_reads;
        }
    }

    Ok(counts)
}

/// Parse a species-abundance report into `(species, fraction)` pairs
///
/// Sorted by fraction, descending. A species listed twice keeps its last
/// fraction. Ties keep report order.
pub fn parse_species_abundance<R: Read>(
    reader: R,
) -> Result<Vec<(String, f64)>, ReportParseError> {
    let mut species: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in text_records(tab_reader(reader, true)) {
        let record = record?;
        if record.len() < 7 || &record[2] != SPECIES_RANK {
            continue;
        }

        let fraction: f64 = record[6]
            .parse()
            .map_err(|_| ReportParseError::InvalidNumber {
                field: "fraction_total_reads",
                value: record[6].to_string(),
                line: record_line(&record),
            })?;

        let name = record[0].to_string();
        match index.get(&name) {
            Some(&i) => species[i].1 = fraction,
            None => {
                index.insert(name.clone(), species.len());
                species.push((name, fraction));
            }
        }
    }

    species.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(species)
}

/// Reads the taxonomic reports of one accession
#[derive(Debug, Clone)]
pub struct TaxonomicCompositionAnalyzer {
    layout: ArtifactLayout,
}

impl TaxonomicCompositionAnalyzer {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Analyze the classification report and, if present, the abundance report
    ///
    /// Never fails. An absent classification report yields zero metrics with
    /// `artifact_present = false`; an absent abundance report only leaves the
    /// species lists empty.
    pub async fn analyze(&self, accession: &str) -> Analysis<TaxonomicMetrics> {
        let report_path = self.layout.classification_report_path(accession);

        let content = match tokio::fs::read(&report_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(accession = %accession, "Classification report not found");
                return Analysis::degraded(
                    TaxonomicMetrics::default(),
                    format!("Classification report not found for {accession}"),
                );
            }
            Err(e) => {
                warn!(accession = %accession, error = %e, "Cannot read classification report");
                return Analysis::degraded(
                    TaxonomicMetrics::default(),
                    format!("Classification report unreadable for {accession}: {e}"),
                );
            }
        };

        let counts = match parse_classification_report(content.as_slice()) {
            Ok(counts) => counts,
            Err(e) => {
                warn!(accession = %accession, error = %e, "Malformed classification report");
                return Analysis::degraded(
                    TaxonomicMetrics::default(),
                    format!("Classification report unreadable for {accession}: {e}"),
                );
            }
        };

        let mut metrics = TaxonomicMetrics {
            artifact_present: true,
            total_reads: counts.total_reads,
            fungal_reads: counts.fungal_reads,
            host_reads: counts.host_reads,
            fungal_signal: counts.fungal_signal(),
            host_contamination: counts.host_contamination(),
            ..Default::default()
        };

        let mut issue = None;
        match self.read_species_abundance(accession).await {
            Ok(Some(species)) => {
                metrics.dominant_species = species
                    .iter()
                    .take(DOMINANT_SPECIES_LIMIT)
                    .map(|(name, _)| name.clone())
                    .collect();
                metrics.species_abundance = species.into_iter().take(ABUNDANCE_LIMIT).collect();
            }
            Ok(None) => {
                debug!(accession = %accession, "No species-abundance report");
            }
            Err(e) => {
                warn!(accession = %accession, error = %e, "Malformed species-abundance report");
                issue = Some(format!(
                    "Species-abundance report unreadable for {accession}: {e}"
                ));
            }
        }

        debug!(
            accession = %accession,
            total_reads = metrics.total_reads,
            fungal_signal = metrics.fungal_signal,
            host_contamination = metrics.host_contamination,
            species = metrics.dominant_species.len(),
            "Taxonomic composition analyzed"
        );

        Analysis { metrics, issue }
    }

    async fn read_species_abundance(
        &self,
        accession: &str,
    ) -> Result<Option<Vec<(String, f64)>>, ReportParseError> {
        let path = self.layout.abundance_report_path(accession);
        match tokio::fs::read(&path).await {
            Ok(content) => parse_species_abundance(content.as_slice()).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
