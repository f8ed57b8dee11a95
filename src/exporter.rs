//! Batch pipeline: load, validate and stage each customer file.

use std::path::PathBuf;

use chrono::Local;
use tracing::{info, warn};

use crate::config::{BatchConfig, ExporterConfig};
use crate::error::Error;
use crate::table;
use crate::validation::{self, ValidationError};

#[derive(Debug)]
pub enum BatchOutcome {
    Exported(PathBuf),
    Rejected(ValidationError),
    Failed(Error),
}

#[derive(Debug)]
pub struct BatchReport {
    pub label: String,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub batches: Vec<BatchReport>,
}

impl RunSummary {
    pub fn all_exported(&self) -> bool {
        self.batches
            .iter()
            .all(|b| matches!(b.outcome, BatchOutcome::Exported(_)))
    }

    pub fn exported(&self) -> Vec<&PathBuf> {
        self.batches
            .iter()
            .filter_map(|b| match &b.outcome {
                BatchOutcome::Exported(path) => Some(path),
                _ => None,
            })
            .collect()
    }
}

/// Runs every configured batch. A batch that fails or is rejected is
/// reported and skipped; the remaining batches are still processed.
pub fn run(config: &ExporterConfig) -> RunSummary {
    println!("=== CUSTOMER DATA PROCESSOR ===");
    println!("Date: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let mut summary = RunSummary::default();
    for batch in &config.batches {
        let outcome = process_batch(batch, config);
        match &outcome {
            BatchOutcome::Exported(path) => info!(batch = %batch.label, path = %path.display(), "batch staged"),
            BatchOutcome::Rejected(reason) => warn!(batch = %batch.label, %reason, "batch rejected"),
            BatchOutcome::Failed(err) => {
                println!("Error while processing {}: {err}", batch.label);
                warn!(batch = %batch.label, error = %err, "batch failed");
            }
        }
        summary.batches.push(BatchReport {
            label: batch.label.clone(),
            outcome,
        });
    }

    println!("\nPROCESSING COMPLETE");
    println!("Files generated in '{}'", config.output_dir.display());
    println!("Next steps:");
    println!("   1. Upload files to HDFS");
    println!("   2. Process with Hive/Spark");
    println!("   3. Apply audit triggers");
    summary
}

pub fn process_batch(batch: &BatchConfig, config: &ExporterConfig) -> BatchOutcome {
    println!("\nProcessing {}...", batch.label);

    let df = match table::load(&batch.input, config.separator_byte()) {
        Ok(df) => df,
        Err(e) => return BatchOutcome::Failed(e),
    };
    println!("Read {} rows", df.height());
    if config.sample_rows > 0 {
        println!("Sample:");
        println!("{}", df.head(Some(config.sample_rows)));
    }

    if let Err(reason) = validation::report(validation::check(&df, &config.schema)) {
        return BatchOutcome::Rejected(reason);
    }

    println!("\nGenerating file for HDFS: {}", batch.output);
    match table::export(&df, &config.output_dir, &batch.output, config.separator_byte()) {
        Ok(path) => {
            println!("File generated: {}", path.display());
            BatchOutcome::Exported(path)
        }
        Err(e) => BatchOutcome::Failed(e),
    }
}
