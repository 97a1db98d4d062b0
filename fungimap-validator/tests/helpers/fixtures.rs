//! On-disk sample fixtures
//!
//! Writes metadata records and tool reports under a temporary storage root
//! using the same path conventions as the validator.

use fungimap_common::config::{
    LoggingConfig, OrchestratorConfig, StorageConfig, ValidationSection, ValidatorConfig,
};
use fungimap_common::ValidationCriteria;
use fungimap_validator::store::ArtifactLayout;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// The ten required fields used throughout the tests
pub const REQUIRED_FIELDS: [&str; 10] = [
    "collection_date",
    "geo_loc_name",
    "host",
    "isolation_source",
    "env_broad_scale",
    "env_local_scale",
    "env_medium",
    "sequencing_method",
    "investigation_type",
    "target_gene",
];

/// A metadata record with every required field meaningfully set
pub fn complete_metadata() -> Value {
    json!({
        "collection_date": "2019-06-14",
        "geo_loc_name": "USA: Oregon, Willamette National Forest",
        "host": "Pseudotsuga menziesii",
        "isolation_source": "rhizosphere soil",
        "env_broad_scale": "temperate coniferous forest biome",
        "env_local_scale": "forest floor",
        "env_medium": "soil",
        "sequencing_method": "Illumina NovaSeq 6000",
        "investigation_type": "metagenome",
        "target_gene": "ITS2",
        "library_layout": "PAIRED"
    })
}

/// Temporary storage root with fixture writers
pub struct TestStorage {
    dir: TempDir,
}

impl TestStorage {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(self.root())
    }

    /// Configuration pointing at this storage root
    pub fn config(&self, batch_size: usize, worker_count: usize) -> ValidatorConfig {
        ValidatorConfig {
            validation: ValidationSection {
                required_metadata_fields: REQUIRED_FIELDS.iter().map(|s| s.to_string()).collect(),
                criteria: ValidationCriteria::default(),
            },
            storage: StorageConfig {
                local_path: self.root().to_path_buf(),
            },
            orchestrator: OrchestratorConfig {
                batch_size,
                worker_count,
                chunk_timeout_secs: 30,
            },
            logging: LoggingConfig::default(),
        }
    }

    pub fn write_metadata(&self, accession: &str, record: &Value) {
        let path = self.layout().metadata_path(accession);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(record).unwrap()).unwrap();
    }

    pub fn write_raw_metadata(&self, accession: &str, content: &str) {
        let path = self.layout().metadata_path(accession);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn write_complete_metadata(&self, accession: &str) {
        self.write_metadata(accession, &complete_metadata());
    }

    pub fn write_classification_report(&self, accession: &str, content: &str) {
        let path = self.layout().classification_report_path(accession);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn write_abundance_report(&self, accession: &str, content: &str) {
        let path = self.layout().abundance_report_path(accession);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// Quality-control archive holding `{acc}_fastqc/fastqc_data.txt`
    pub fn write_quality_archive(&self, accession: &str, report: &str) {
        let path = self.layout().quality_archive_path(accession);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(format!("{accession}_fastqc/fastqc_data.txt"), options)
            .unwrap();
        zip.write_all(report.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    /// Raw reads file of `bytes` length (sparse where the filesystem allows)
    pub fn write_raw_reads(&self, accession: &str, bytes: u64) {
        let path = self.layout().raw_reads_path(accession);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        file.set_len(bytes).unwrap();
    }
}

/// Classification report with the given unclassified, Fungi and human clade counts
pub fn classification_report(total: u64, fungal: u64, host: u64) -> String {
    format!(
        " 30.00\t{total}\t{total}\tU\t0\tunclassified\n\
         70.00\t9000\t100\tR\t1\troot\n\
         20.00\t{fungal}\t12\tK\t4751\t      Fungi\n\
          5.00\t{host}\t{host}\tS\t9606\t        Homo sapiens\n"
    )
}

/// Quality-control report text for `total_sequences` reads
pub fn fastqc_report(total_sequences: u64, gc: u32, means: &[f64]) -> String {
    let mut text = format!(
        "##FastQC\t0.12.1\n>>Basic Statistics\tpass\n#Measure\tValue\n\
         Total Sequences\t{total_sequences}\n%GC\t{gc}\n>>END_MODULE\n\
         >>Per base sequence quality\tpass\n\
         #Base\tMean\tMedian\tLower Quartile\tUpper Quartile\t10th Percentile\t90th Percentile\n"
    );
    for (i, mean) in means.iter().enumerate() {
        text.push_str(&format!("{}\t{}\t34.0\t32.0\t36.0\t30.0\t37.0\n", i + 1, mean));
    }
    text.push_str(">>END_MODULE\n");
    text
}
