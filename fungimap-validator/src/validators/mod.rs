//! Sample validators
//!
//! 1. **completeness_scorer** - metadata completeness tiers
//! 2. **sample_validator** - per-accession pipeline producing a ValidationResult

pub mod completeness_scorer;
pub mod sample_validator;

pub use completeness_scorer::{CompletenessScore, CompletenessTier, MetadataCompletenessScorer};
pub use sample_validator::{SampleState, SingleSampleValidator};
