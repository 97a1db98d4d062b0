//! Resource estimation for downstream processing
//!
//! Linear in raw input size (GiB):
//! - memory = 3 × size
//! - disk = 5 × size
//! - cpu hours = size / 2
//!
//! Every figure is rounded to two decimal places.

use crate::store::ArtifactLayout;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;
use tracing::{debug, warn};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Estimated requirements for one or more samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub memory_gb: f64,
    pub disk_gb: f64,
    pub cpu_hours: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ResourceEstimate {
    /// Estimate from input size in GiB; negative or non-finite sizes count as zero
    pub fn from_size_gb(size_gb: f64) -> Self {
        let size_gb = if size_gb.is_finite() { size_gb.max(0.0) } else { 0.0 };
        Self {
            memory_gb: round2(size_gb * 3.0),
            disk_gb: round2(size_gb * 5.0),
            cpu_hours: round2(size_gb / 2.0),
        }
    }

    pub fn from_size_bytes(bytes: u64) -> Self {
        Self::from_size_gb(bytes as f64 / BYTES_PER_GIB)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn display_string(&self) -> String {
        format!(
            "memory {:.2} GB, disk {:.2} GB, cpu {:.2} h",
            self.memory_gb, self.disk_gb, self.cpu_hours
        )
    }
}

impl Add for ResourceEstimate {
    type Output = ResourceEstimate;

    fn add(self, other: Self) -> Self {
        Self {
            memory_gb: round2(self.memory_gb + other.memory_gb),
            disk_gb: round2(self.disk_gb + other.disk_gb),
            cpu_hours: round2(self.cpu_hours + other.cpu_hours),
        }
    }
}

impl Sum for ResourceEstimate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Estimate for one accession, with a warning when the input was unavailable
#[derive(Debug, Clone, PartialEq)]
pub struct AccessionEstimate {
    pub accession: String,
    pub estimate: ResourceEstimate,
    pub warning: Option<String>,
}

/// Estimates requirements from the size of each accession's raw reads
#[derive(Debug, Clone)]
pub struct ResourceEstimator {
    layout: ArtifactLayout,
}

impl ResourceEstimator {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Estimate for one accession; a missing input yields zeros and a warning
    pub async fn estimate(&self, accession: &str) -> AccessionEstimate {
        let path = self.layout.raw_reads_path(accession);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                let estimate = ResourceEstimate::from_size_bytes(meta.len());
                debug!(
                    accession = %accession,
                    bytes = meta.len(),
                    memory_gb = estimate.memory_gb,
                    disk_gb = estimate.disk_gb,
                    cpu_hours = estimate.cpu_hours,
                    "Resources estimated"
                );
                AccessionEstimate {
                    accession: accession.to_string(),
                    estimate,
                    warning: None,
                }
            }
            Ok(_) => {
                warn!(accession = %accession, path = %path.display(), "Raw reads path is not a file; estimate is zero");
                Self::unestimated(accession, format!("Input path is not a file for {accession}"))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(accession = %accession, path = %path.display(), "Raw reads not found; estimate is zero");
                Self::unestimated(accession, format!("Input file not found for {accession}"))
            }
            Err(e) => {
                warn!(accession = %accession, path = %path.display(), error = %e, "Cannot read raw reads metadata; estimate is zero");
                Self::unestimated(accession, format!("Input file unreadable for {accession}: {e}"))
            }
        }
    }

    fn unestimated(accession: &str, warning: String) -> AccessionEstimate {
        AccessionEstimate {
            accession: accession.to_string(),
            estimate: ResourceEstimate::default(),
            warning: Some(warning),
        }
    }

    /// Estimates for several accessions, in input order
    pub async fn estimate_all(&self, accessions: &[String]) -> Vec<AccessionEstimate> {
        let mut estimates = Vec::with_capacity(accessions.len());
        for accession in accessions {
            estimates.push(self.estimate(accession).await);
        }
        estimates
    }

    /// Sum of per-accession estimates
    pub fn total(estimates: &[AccessionEstimate]) -> ResourceEstimate {
        estimates.iter().map(|e| e.estimate).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_linear_scaling() {
        let estimate = ResourceEstimate::from_size_gb(2.0);
        assert_eq!(estimate.memory_gb, 6.0);
        assert_eq!(estimate.disk_gb, 10.0);
        assert_eq!(estimate.cpu_hours, 1.0);
    }

    #[test]
    fn test_rounding() {
        let estimate = ResourceEstimate::from_size_gb(1.0 / 3.0);
        assert_eq!(estimate.memory_gb, 1.0);
        assert_eq!(estimate.disk_gb, 1.67);
        assert_eq!(estimate.cpu_hours, 0.17);
    }

    #[test]
    fn test_bytes_to_gib() {
        let estimate = ResourceEstimate::from_size_bytes(1024 * 1024 * 1024);
        assert_eq!(estimate, ResourceEstimate::from_size_gb(1.0));
    }

    #[test]
    fn test_monotonic_in_size() {
        let sizes = [0.0, 0.004, 0.5, 1.0, 1.25, 7.5, 100.0, 1234.5678];
        for pair in sizes.windows(2) {
            let (small, large) = (
                ResourceEstimate::from_size_gb(pair[0]),
                ResourceEstimate::from_size_gb(pair[1]),
            );
            assert!(large.memory_gb >= small.memory_gb);
            assert!(large.disk_gb >= small.disk_gb);
            assert!(large.cpu_hours >= small.cpu_hours);
            assert!((large.memory_gb - 3.0 * pair[1]).abs() <= 0.005 + 1e-9);
            assert!((large.disk_gb - 5.0 * pair[1]).abs() <= 0.005 + 1e-9);
            assert!((large.cpu_hours - pair[1] / 2.0).abs() <= 0.005 + 1e-9);
        }
    }

    #[test]
    fn test_negative_size_is_zero() {
        assert!(ResourceEstimate::from_size_gb(-3.0).is_zero());
        assert!(ResourceEstimate::from_size_gb(f64::NAN).is_zero());
    }

    #[tokio::test]
    async fn test_missing_input_warns() {
        let dir = TempDir::new().unwrap();
        let estimator = ResourceEstimator::new(ArtifactLayout::new(dir.path()));

        let estimate = estimator.estimate("SRR404").await;

        assert!(estimate.estimate.is_zero());
        assert_eq!(estimate.warning.as_deref(), Some("Input file not found for SRR404"));
    }

    #[tokio::test]
    async fn test_directory_input_is_not_reported_missing() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        std::fs::create_dir_all(layout.raw_reads_path("SRR5")).unwrap();

        let estimate = ResourceEstimator::new(layout).estimate("SRR5").await;

        assert!(estimate.estimate.is_zero());
        assert_eq!(estimate.warning.as_deref(), Some("Input path is not a file for SRR5"));
    }

    #[tokio::test]
    async fn test_total_sums_estimates() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let path = layout.raw_reads_path("SRR1");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0u8; 1024 * 1024]).unwrap();

        let estimator = ResourceEstimator::new(layout);
        let estimates = estimator
            .estimate_all(&["SRR1".to_string(), "SRR2".to_string()])
            .await;

        assert!(estimates[0].warning.is_none());
        assert!(estimates[1].warning.is_some());
        // 1 MiB is about 0.001 GiB
        assert_eq!(ResourceEstimator::total(&estimates).disk_gb, 0.0);
    }
}
