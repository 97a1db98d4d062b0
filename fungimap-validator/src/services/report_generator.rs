//! Validation report
//!
//! One row per accession with columns
//! `Accession, Status, metadata_completeness, fungal_signal, read_pairs,
//! host_contamination, warnings_count`, sorted by accession, plus aggregate
//! pass statistics.

use crate::error::ValidatorResult;
use crate::types::{Accession, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Accession")]
    pub accession: Accession,
    #[serde(rename = "Status")]
    pub status: String,
    pub metadata_completeness: f64,
    pub fungal_signal: f64,
    pub read_pairs: u64,
    pub host_contamination: f64,
    pub warnings_count: usize,
}

impl From<&ValidationResult> for ReportRow {
    fn from(result: &ValidationResult) -> Self {
        Self {
            accession: result.accession.clone(),
            status: result.status_label().to_string(),
            metadata_completeness: result.metrics.metadata_completeness(),
            fungal_signal: result.metrics.fungal_signal(),
            read_pairs: result.metrics.read_pairs(),
            host_contamination: result.metrics.host_contamination(),
            warnings_count: result.warnings.len(),
        }
    }
}

/// Aggregate pass statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// `passed / total × 100`, 0.0 for an empty report
    pub pass_rate: f64,
}

impl ReportSummary {
    pub fn display_string(&self) -> String {
        format!(
            "{} samples: {} passed, {} failed ({:.1}% pass rate)",
            self.total, self.passed, self.failed, self.pass_rate
        )
    }
}

/// Tabular report over a result mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
}

impl ValidationReport {
    pub fn from_results(results: &HashMap<Accession, ValidationResult>) -> Self {
        let mut rows: Vec<ReportRow> = results
            .iter()
            .map(|(accession, result)| {
                let mut row = ReportRow::from(result);
                row.accession = accession.clone();
                row
            })
            .collect();
        rows.sort_by(|a, b| a.accession.cmp(&b.accession));

        let total = rows.len();
        let passed = results.values().filter(|r| r.passes_all).count();
        let pass_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        Self {
            rows,
            summary: ReportSummary {
                total,
                passed,
                failed: total - passed,
                pass_rate,
            },
        }
    }

    /// Write the rows as CSV with a header line
    pub fn write_csv<W: Write>(&self, writer: W) -> ValidatorResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            csv_writer.write_record([
                "Accession",
                "Status",
                "metadata_completeness",
                "fungal_signal",
                "read_pairs",
                "host_contamination",
                "warnings_count",
            ])?;
        }
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the report to `path`, creating parent directories
    pub fn write_to_path(&self, path: &Path) -> ValidatorResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;

        info!(path = %path.display(), rows = self.rows.len(), "Validation report written");
        Ok(())
    }

    pub fn log_summary(&self) {
        info!(
            total = self.summary.total,
            passed = self.summary.passed,
            failed = self.summary.failed,
            pass_rate = self.summary.pass_rate,
            "Validation summary: {}",
            self.summary.display_string()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{metric, ValidationMetrics};

    fn result(accession: &str, passes_all: bool, warnings: usize) -> ValidationResult {
        let mut metrics = ValidationMetrics::with_defaults();
        metrics.set(metric::METADATA_COMPLETENESS, if passes_all { 100.0 } else { 30.0 });
        metrics.set(metric::READ_PAIRS, 1_250_000.0);
        let mut result = ValidationResult::failed(accession, metrics, String::new());
        result.passes_all = passes_all;
        result.warnings = (0..warnings).map(|i| format!("w{i}")).collect();
        result
    }

    fn mapping(results: Vec<ValidationResult>) -> HashMap<Accession, ValidationResult> {
        results.into_iter().map(|r| (r.accession.clone(), r)).collect()
    }

    #[test]
    fn test_summary_and_order() {
        let report = ValidationReport::from_results(&mapping(vec![
            result("SRR3", false, 1),
            result("SRR1", true, 0),
            result("SRR2", true, 0),
        ]));

        let order: Vec<&str> = report.rows.iter().map(|r| r.accession.as_str()).collect();
        assert_eq!(order, vec!["SRR1", "SRR2", "SRR3"]);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert!((report.summary.pass_rate - 66.666_666).abs() < 1e-3);
        assert_eq!(report.rows[2].status, "FAIL");
        assert_eq!(report.rows[2].warnings_count, 1);
    }

    #[test]
    fn test_empty_report_has_zero_pass_rate() {
        let report = ValidationReport::from_results(&HashMap::new());
        assert_eq!(report.summary, ReportSummary::default());
    }

    #[test]
    fn test_csv_output() {
        let report = ValidationReport::from_results(&mapping(vec![result("SRR1", true, 0)]));
        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Accession,Status,metadata_completeness,fungal_signal,read_pairs,host_contamination,warnings_count")
        );
        assert_eq!(lines.next(), Some("SRR1,PASS,100.0,0.0,1250000,0.0,0"));
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let mut buffer = Vec::new();
        ValidationReport::default().write_csv(&mut buffer).unwrap();
        assert!(String::from_utf8(buffer).unwrap().starts_with("Accession,Status,"));
    }
}
