//! Batch outcomes

use crate::error::WriteError;

/// Result of writing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Applied,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Position of the record in the submitted slice
    pub index: usize,
    pub identity: String,
    pub status: RecordStatus,
}

impl RecordOutcome {
    pub fn is_applied(&self) -> bool {
        self.status == RecordStatus::Applied
    }
}

/// Per-record outcomes of one batch, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<RecordOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes.iter().filter(|o| !o.is_applied())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Turn any failure into [`WriteError::RecordsFailed`].
    pub fn into_result(self) -> Result<Self, WriteError> {
        let details: Vec<String> = self
            .outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                RecordStatus::Failed(message) => Some(format!(
                    "[{}] {}: {}",
                    outcome.index, outcome.identity, message
                )),
                RecordStatus::Applied => None,
            })
            .collect();

        if details.is_empty() {
            return Ok(self);
        }

        Err(WriteError::RecordsFailed {
            failed: details.len(),
            total: self.total(),
            details: details.join("; "),
        })
    }
}
