//! Single Sample Validator
//!
//! Composes the metadata scorer and the report analyzers into one
//! [`ValidationResult`] per accession.
//!
//! # Stages
//! ```text
//! Unvalidated → MetadataChecked → SequenceChecked → TaxonomyChecked → Final(PASS|FAIL)
//!      │
//!      └─ no metadata record ─────────────────────────────────────────→ Final(FAIL)
//! ```
//!
//! The pass decision depends only on metadata: a sample passes when every
//! required field is meaningful. Sequence and taxonomy stages add their
//! metrics and, when their artifact was present, compare them against the
//! configured criteria. Shortfalls become advisories and do not fail the
//! sample.
//!
//! The validator never returns an error to its caller: store failures and
//! malformed metadata become a FAIL result with a warning.

use crate::analyzers::{Analysis, SequenceQualityAnalyzer, TaxonomicCompositionAnalyzer};
use crate::store::{is_valid_accession, ArtifactLayout, MetadataStore, StoreError};
use crate::types::{
    metric, SampleValidation, SequenceQualityMetrics, StageOutcome, TaxonomicMetrics,
    ValidationError, ValidationMetrics, ValidationResult,
};
use crate::validators::completeness_scorer::{
    CompletenessScore, CompletenessTier, MetadataCompletenessScorer,
};
use async_trait::async_trait;
use fungimap_common::{ValidationCriteria, ValidatorConfig};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Position of a sample in the validation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleState {
    Unvalidated,
    MetadataChecked,
    SequenceChecked,
    TaxonomyChecked,
    Final { passes_all: bool },
}

/// Validates one accession at a time
pub struct SingleSampleValidator {
    store: MetadataStore,
    scorer: MetadataCompletenessScorer,
    sequence: SequenceQualityAnalyzer,
    taxonomy: TaxonomicCompositionAnalyzer,
    criteria: ValidationCriteria,
}

impl SingleSampleValidator {
    /// Build from a loaded configuration
    pub fn new(config: &ValidatorConfig) -> Self {
        Self::with_parts(
            ArtifactLayout::new(config.storage_root()),
            config.validation.required_metadata_fields.clone(),
            config.criteria().clone(),
        )
    }

    pub fn with_parts(
        layout: ArtifactLayout,
        required_fields: Vec<String>,
        criteria: ValidationCriteria,
    ) -> Self {
        Self {
            store: MetadataStore::new(layout.clone()),
            scorer: MetadataCompletenessScorer::new(required_fields),
            sequence: SequenceQualityAnalyzer::new(layout.clone()),
            taxonomy: TaxonomicCompositionAnalyzer::new(layout),
            criteria,
        }
    }

    pub fn criteria(&self) -> &ValidationCriteria {
        &self.criteria
    }

    /// Validate one accession; never fails
    pub async fn validate_sample(&self, accession: &str) -> ValidationResult {
        let started = Instant::now();

        let mut result = if !is_valid_accession(accession) {
            warn!(accession = %accession, "Rejected invalid accession");
            ValidationResult::failed(
                accession,
                Self::zero_metrics(),
                format!("Invalid accession '{accession}'"),
            )
        } else {
            match self.run_stages(accession).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(accession = %accession, error = %e, "Metadata could not be read");
                    ValidationResult::failed(
                        accession,
                        Self::zero_metrics(),
                        format!("Validation error: {e}"),
                    )
                }
            }
        };

        result.metrics.set(
            metric::VALIDATION_TIME_SECONDS,
            started.elapsed().as_secs_f64(),
        );

        info!(
            accession = %accession,
            status = result.status_label(),
            metadata_completeness = result.metrics.metadata_completeness(),
            warnings = result.warnings.len(),
            advisories = result.advisories.len(),
            "Sample validated"
        );

        result
    }

    async fn run_stages(&self, accession: &str) -> Result<ValidationResult, StoreError> {
        let mut state = SampleState::Unvalidated;
        trace!(accession = %accession, state = ?state, "Validation started");

        if !self.store.exists(accession).await? {
            let state = SampleState::Final { passes_all: false };
            debug!(accession = %accession, state = ?state, "Metadata record missing; skipping stages");
            return Ok(ValidationResult::failed(
                accession,
                Self::zero_metrics(),
                format!("Metadata file does not exist for {accession}"),
            ));
        }

        let score = self.scorer.score(&self.store, accession).await?;
        let mut metrics = Self::zero_metrics();
        metrics.set(metric::METADATA_COMPLETENESS, score.completeness);
        let passes_all = score.tier == CompletenessTier::Complete;

        let mut warnings = Vec::new();
        if !passes_all {
            warnings.push(Self::completeness_warning(&score));
        }
        state = Self::advance(accession, state, SampleState::MetadataChecked);

        let mut advisories = Vec::new();

        let sequence = self.sequence.analyze(accession).await;
        metrics.merge(sequence.metrics.to_metrics());
        let sequence_quality = self.review_sequence(sequence, &mut advisories);
        state = Self::advance(accession, state, SampleState::SequenceChecked);

        let taxonomy = self.taxonomy.analyze(accession).await;
        metrics.merge(taxonomy.metrics.to_metrics());
        let taxonomy = self.review_taxonomy(taxonomy, &mut advisories);
        state = Self::advance(accession, state, SampleState::TaxonomyChecked);

        Self::advance(accession, state, SampleState::Final { passes_all });

        Ok(ValidationResult {
            accession: accession.to_string(),
            passes_all,
            metrics,
            warnings,
            replacement_candidates: None,
            sequence_quality,
            taxonomy,
            advisories,
        })
    }

    fn advance(accession: &str, from: SampleState, to: SampleState) -> SampleState {
        trace!(accession = %accession, from = ?from, to = ?to, "Stage transition");
        to
    }

    fn zero_metrics() -> ValidationMetrics {
        ValidationMetrics::with_defaults()
    }

    fn completeness_warning(score: &CompletenessScore) -> String {
        format!(
            "{} of {} required metadata fields have invalid values (missing, empty, or 'Unknown'): {}",
            score.invalid_count(),
            score.total_required,
            score.invalid_fields.join(", ")
        )
    }

    fn review_sequence(
        &self,
        analysis: Analysis<SequenceQualityMetrics>,
        advisories: &mut Vec<String>,
    ) -> StageOutcome<SequenceQualityMetrics> {
        advisories.extend(analysis.issue);
        let metrics = analysis.metrics;

        if metrics.artifact_present && metrics.read_pairs < self.criteria.min_read_pairs {
            advisories.push(format!(
                "read_pairs {} below minimum {}",
                metrics.read_pairs, self.criteria.min_read_pairs
            ));
        }

        StageOutcome::Evaluated(metrics)
    }

    fn review_taxonomy(
        &self,
        analysis: Analysis<TaxonomicMetrics>,
        advisories: &mut Vec<String>,
    ) -> StageOutcome<TaxonomicMetrics> {
        advisories.extend(analysis.issue);
        let metrics = analysis.metrics;

        if metrics.artifact_present {
            if metrics.fungal_signal < self.criteria.min_fungal_signal {
                advisories.push(format!(
                    "fungal_signal {:.2}% below minimum {:.2}%",
                    metrics.fungal_signal, self.criteria.min_fungal_signal
                ));
            }
            if metrics.host_contamination > self.criteria.max_host_contamination {
                advisories.push(format!(
                    "host_contamination {:.2}% above maximum {:.2}%",
                    metrics.host_contamination, self.criteria.max_host_contamination
                ));
            }
        }

        StageOutcome::Evaluated(metrics)
    }
}

#[async_trait]
impl SampleValidation for SingleSampleValidator {
    fn name(&self) -> &'static str {
        "SingleSampleValidator"
    }

    async fn validate(&self, accession: &str) -> Result<ValidationResult, ValidationError> {
        Ok(self.validate_sample(accession).await)
    }
}
