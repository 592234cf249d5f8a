//! # Validation Metrics
//!
//! Prometheus metrics for block acceptance, enabled with the `metrics`
//! feature. Without it every `observe_*` call compiles to nothing.
//!
//! ```toml
//! vc-validation = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `validation_blocks_total{result}` - accepted or rejected blocks
//! - `validation_rejections_total{stage, reason}` - why a block failed, split
//!   into header, commit and evidence stages
//! - `validation_evidence_total{kind, outcome}` - per-item verdicts or
//!   rejection reasons, by evidence kind
//! - `validation_evidence_per_block` - evidence items carried by accepted blocks
//! - `validation_latency_seconds` - time to judge one block

use crate::domain::{EvidenceError, EvidenceVerdict, ValidationError};
use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref BLOCKS: IntCounterVec = register_int_counter_vec!(
        "validation_blocks_total",
        "Blocks judged, by result",
        &["result"]
    )
    .expect("Failed to create BLOCKS metric");

    pub static ref REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "validation_rejections_total",
        "Rejected blocks, by failing stage and reason",
        &["stage", "reason"]
    )
    .expect("Failed to create REJECTIONS metric");

    pub static ref EVIDENCE: IntCounterVec = register_int_counter_vec!(
        "validation_evidence_total",
        "Evidence items judged, by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("Failed to create EVIDENCE metric");

    pub static ref EVIDENCE_PER_BLOCK: Histogram = register_histogram!(
        "validation_evidence_per_block",
        "Evidence items carried by accepted blocks",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]
    )
    .expect("Failed to create EVIDENCE_PER_BLOCK metric");

    pub static ref LATENCY: Histogram = register_histogram!(
        "validation_latency_seconds",
        "Time taken to judge a block in seconds",
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to create LATENCY metric");
}

/// `result` label of a judged block.
pub fn block_result(result: &Result<Vec<EvidenceVerdict>, ValidationError>) -> &'static str {
    match result {
        Ok(_) => "accepted",
        Err(_) => "rejected",
    }
}

/// `outcome` label of a judged evidence item: the verdict when it stands,
/// the rejection reason otherwise.
pub fn evidence_outcome(result: &Result<EvidenceVerdict, EvidenceError>) -> &'static str {
    match result {
        Ok(verdict) => verdict.label(),
        Err(err) => err.label(),
    }
}

/// Record the outcome of judging one block.
#[cfg(feature = "metrics")]
pub fn observe_block(result: &Result<Vec<EvidenceVerdict>, ValidationError>, elapsed: Duration) {
    LATENCY.observe(elapsed.as_secs_f64());
    BLOCKS.with_label_values(&[block_result(result)]).inc();
    match result {
        Ok(verdicts) => EVIDENCE_PER_BLOCK.observe(verdicts.len() as f64),
        Err(err) => REJECTIONS
            .with_label_values(&[err.stage(), err.label()])
            .inc(),
    }
}

/// Record the outcome of judging one evidence item of `kind`.
#[cfg(feature = "metrics")]
pub fn observe_evidence(kind: &str, result: &Result<EvidenceVerdict, EvidenceError>) {
    EVIDENCE
        .with_label_values(&[kind, evidence_outcome(result)])
        .inc();
}

#[cfg(not(feature = "metrics"))]
pub fn observe_block(_result: &Result<Vec<EvidenceVerdict>, ValidationError>, _elapsed: Duration) {}

#[cfg(not(feature = "metrics"))]
pub fn observe_evidence(_kind: &str, _result: &Result<EvidenceVerdict, EvidenceError>) {}
