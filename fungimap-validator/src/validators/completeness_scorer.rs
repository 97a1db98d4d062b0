//! Metadata Completeness Scorer
//!
//! Counts how many required metadata fields hold a meaningful value and maps
//! the count onto a three-tier triage score.
//!
//! # Meaningful values
//! A required field is valid when it is present, not `null`, not the empty
//! string, and not the placeholder `"Unknown"`. Non-string values (numbers,
//! booleans) count as valid.
//!
//! # Tiers
//! | Valid fields           | Tier       | Completeness |
//! |------------------------|------------|--------------|
//! | all required           | Complete   | 100.0        |
//! | at least one, not all  | Partial    | 30.0         |
//! | none                   | Unusable   | 0.0          |
//!
//! The unquantized ratio is kept on the score for logging only; pass/fail
//! decisions use the tier.
//!
//! # Example
//! ```rust,ignore
//! use fungimap_validator::validators::MetadataCompletenessScorer;
//!
//! let scorer = MetadataCompletenessScorer::new(required_fields);
//! let score = scorer.score(&store, "SRR1234567").await?;
//!
//! println!("Completeness: {:.1}% ({}/{})", score.completeness, score.valid_count, score.total_required);
//! ```

use crate::store::{MetadataStore, StoreError};
use serde_json::{Map, Value};
use tracing::debug;

/// Placeholder the metadata harvester writes for unknown values
pub const PLACEHOLDER_VALUE: &str = "Unknown";

/// Triage tier for a metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletenessTier {
    /// Every required field is meaningful
    Complete,
    /// Some, but not all, required fields are meaningful
    Partial,
    /// No required field is meaningful, or there is no record
    Unusable,
}

impl CompletenessTier {
    pub fn from_counts(valid_count: usize, total_required: usize) -> Self {
        if total_required > 0 && valid_count == total_required {
            CompletenessTier::Complete
        } else if valid_count > 0 {
            CompletenessTier::Partial
        } else {
            CompletenessTier::Unusable
        }
    }

    /// Quantized completeness percentage
    pub fn completeness(self) -> f64 {
        match self {
            CompletenessTier::Complete => 100.0,
            CompletenessTier::Partial => 30.0,
            CompletenessTier::Unusable => 0.0,
        }
    }
}

/// Completeness of one metadata record
#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessScore {
    pub tier: CompletenessTier,
    /// Quantized percentage: 0.0, 30.0 or 100.0
    pub completeness: f64,
    pub valid_count: usize,
    pub total_required: usize,
    /// `valid_count / total_required * 100`, unquantized
    pub raw_ratio: f64,
    /// Required fields that were missing, null, empty or placeholders, in order
    pub invalid_fields: Vec<String>,
}

impl CompletenessScore {
    pub fn invalid_count(&self) -> usize {
        self.total_required - self.valid_count
    }
}

/// Metadata Completeness Scorer
pub struct MetadataCompletenessScorer {
    required_fields: Vec<String>,
}

impl MetadataCompletenessScorer {
    pub fn new(required_fields: Vec<String>) -> Self {
        Self { required_fields }
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// Whether a field value counts towards completeness
    pub fn is_meaningful(value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty() && s != PLACEHOLDER_VALUE,
            Some(_) => true,
        }
    }

    /// Score a loaded record
    pub fn score_record(&self, record: &Map<String, Value>) -> CompletenessScore {
        let invalid_fields: Vec<String> = self
            .required_fields
            .iter()
            .filter(|field| !Self::is_meaningful(record.get(field.as_str())))
            .cloned()
            .collect();

        let total_required = self.required_fields.len();
        let valid_count = total_required - invalid_fields.len();
        let tier = CompletenessTier::from_counts(valid_count, total_required);

        let raw_ratio = if total_required == 0 {
            0.0
        } else {
            valid_count as f64 / total_required as f64 * 100.0
        };

        CompletenessScore {
            tier,
            completeness: tier.completeness(),
            valid_count,
            total_required,
            raw_ratio,
            invalid_fields,
        }
    }

    /// Score when there is no record at all
    pub fn score_absent(&self) -> CompletenessScore {
        CompletenessScore {
            tier: CompletenessTier::Unusable,
            completeness: 0.0,
            valid_count: 0,
            total_required: self.required_fields.len(),
            raw_ratio: 0.0,
            invalid_fields: self.required_fields.clone(),
        }
    }

    /// Load and score the record for `accession`
    ///
    /// A missing record is scored as unusable, not an error.
    pub async fn score(
        &self,
        store: &MetadataStore,
        accession: &str,
    ) -> Result<CompletenessScore, StoreError> {
        let score = match store.load(accession).await? {
            Some(record) => self.score_record(&record),
            None => self.score_absent(),
        };

        debug!(
            accession = %accession,
            valid = score.valid_count,
            total = score.total_required,
            raw_ratio = score.raw_ratio,
            completeness = score.completeness,
            "Metadata completeness scored"
        );

        Ok(score)
    }
}
