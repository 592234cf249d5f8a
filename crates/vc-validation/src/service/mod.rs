//! Validation Service - block acceptance
//!
//! # Architecture
//! - Header, then last commit, then evidence; the first failure rejects
//! - The evidence pool is consulted read-only except for undecided
//!   amnesia evidence, which is added to it
//! - No retries: every failure is returned to the caller

use crate::config::ValidationConfig;
use crate::domain::{EvidenceError, EvidenceVerdict, ValidationError, ValidationResult};
use crate::metrics;
use crate::ports::{BlockValidationApi, EvidencePool, ValidatorHistory};
use crate::validation::{CommitValidator, EvidenceVerifier, HeaderValidator};
use shared_types::{Block, ChainState, Evidence};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Validation Service
pub struct ValidationService<P, H>
where
    P: EvidencePool,
    H: ValidatorHistory,
{
    evidence_pool: Arc<P>,
    validator_history: Arc<H>,
    config: ValidationConfig,
}

/// Dependencies for ValidationService
pub struct ValidationDependencies<P, H> {
    pub evidence_pool: Arc<P>,
    pub validator_history: Arc<H>,
    pub config: ValidationConfig,
}

impl<P, H> ValidationService<P, H>
where
    P: EvidencePool,
    H: ValidatorHistory,
{
    /// Create a new ValidationService
    pub fn new(deps: ValidationDependencies<P, H>) -> Self {
        Self {
            evidence_pool: deps.evidence_pool,
            validator_history: deps.validator_history,
            config: deps.config,
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn evidence_pool(&self) -> &Arc<P> {
        &self.evidence_pool
    }

    /// Validate a block and report how each evidence item was handled.
    pub fn validate_block_verdicts(
        &self,
        state: &ChainState,
        block: &Block,
    ) -> ValidationResult<Vec<EvidenceVerdict>> {
        let started = Instant::now();
        let result = self.run_checks(state, block);
        metrics::observe_block(&result, started.elapsed());

        match &result {
            Ok(verdicts) => {
                debug!(
                    height = block.header.height,
                    hash = %hex::encode_upper(block.hash()),
                    evidence = verdicts.len(),
                    "Block accepted"
                );
            }
            Err(err) => {
                warn!(
                    height = block.header.height,
                    hash = %hex::encode_upper(block.hash()),
                    stage = err.stage(),
                    reason = err.label(),
                    error = %err,
                    "Block rejected"
                );
            }
        }
        result
    }

    fn run_checks(
        &self,
        state: &ChainState,
        block: &Block,
    ) -> ValidationResult<Vec<EvidenceVerdict>> {
        HeaderValidator::validate(state, block, &self.config)?;
        CommitValidator::validate(state, block)?;
        let verdicts = EvidenceVerifier::validate_block_evidence(
            state,
            &block.evidence,
            self.evidence_pool.as_ref(),
            self.validator_history.as_ref(),
        )?;
        for (item, verdict) in block.evidence.iter().zip(&verdicts) {
            metrics::observe_evidence(item.kind(), &Ok(*verdict));
        }
        Ok(verdicts)
    }
}

impl<P, H> BlockValidationApi for ValidationService<P, H>
where
    P: EvidencePool,
    H: ValidatorHistory,
{
    fn validate_block(&self, state: &ChainState, block: &Block) -> Result<(), ValidationError> {
        self.validate_block_verdicts(state, block).map(|_| ())
    }

    fn verify_evidence(
        &self,
        state: &ChainState,
        evidence: &Evidence,
    ) -> Result<EvidenceVerdict, EvidenceError> {
        let result = EvidenceVerifier::verify(
            state,
            evidence,
            self.evidence_pool.as_ref(),
            self.validator_history.as_ref(),
        );
        metrics::observe_evidence(evidence.kind(), &result);
        match &result {
            Ok(verdict) => {
                debug!(
                    kind = evidence.kind(),
                    height = evidence.height(),
                    verdict = %verdict,
                    "Evidence accepted"
                );
            }
            Err(err) => {
                warn!(
                    kind = evidence.kind(),
                    height = evidence.height(),
                    reason = err.label(),
                    error = %err,
                    "Evidence rejected"
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests;
