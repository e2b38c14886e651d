//! Label mutations against the label store
//!
//! Account labels are replaced wholesale: a delete negates every value in the
//! [`LabelUniverse`], an add creates the tier labels plus the verified label,
//! and an update is a delete followed by an add as two separate submissions.
//! The store offers no multi-operation transaction, so an update that fails
//! between the two steps leaves the subject with no labels until it is
//! retried.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, SubmissionError};
use crate::labels::{LabelUniverse, VERIFIED_LABEL};
use crate::tiers::ProfileSignals;

/// Requested change to a subject's labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelAction {
    /// Create labels
    Add,
    /// Negate every managed label
    Delete,
    /// Negate every managed label, then create labels
    Update,
}

impl LabelAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelAction::Add => "add",
            LabelAction::Delete => "delete",
            LabelAction::Update => "update",
        }
    }
}

impl fmt::Display for LabelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(LabelAction::Add),
            "delete" => Ok(LabelAction::Delete),
            "update" => Ok(LabelAction::Update),
            _ => Err(ConfigError::InvalidAction(s.to_string())),
        }
    }
}

/// One negate/create submission for one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMutationRequest {
    action: LabelAction,
    subject: String,
    create_labels: BTreeSet<String>,
    negate_labels: BTreeSet<String>,
}

impl LabelMutationRequest {
    /// Action this request was built for
    pub fn action(&self) -> LabelAction {
        self.action
    }

    /// Account the labels apply to
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Values to create
    pub fn create_labels(&self) -> &BTreeSet<String> {
        &self.create_labels
    }

    /// Values to negate
    pub fn negate_labels(&self) -> &BTreeSet<String> {
        &self.negate_labels
    }

    /// Whether this request only removes labels
    pub fn is_negation(&self) -> bool {
        self.create_labels.is_empty() && !self.negate_labels.is_empty()
    }
}

/// Destination of label mutations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelStoreClient: Send + Sync {
    /// Apply one request; the store either accepts it whole or rejects it
    async fn submit(&self, request: &LabelMutationRequest) -> Result<(), SubmissionError>;
}

/// What happened to one request of a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The store accepted the request
    Submitted,
    /// The store rejected the request or could not be reached
    Failed(SubmissionError),
    /// Not attempted because an earlier step failed
    Skipped,
}

/// A request and its fate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// The request
    pub request: LabelMutationRequest,
    /// Its status
    pub status: StepStatus,
}

/// Result of applying an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReport {
    /// The action that was applied
    pub action: LabelAction,
    /// Every planned request, in submission order
    pub steps: Vec<StepOutcome>,
}

impl MutationReport {
    /// Whether every step was accepted
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Submitted)
    }

    /// First failure, if any
    pub fn first_error(&self) -> Option<&SubmissionError> {
        self.steps.iter().find_map(|s| match &s.status {
            StepStatus::Failed(e) => Some(e),
            _ => None,
        })
    }

    /// Collapse to a plain result
    pub fn into_result(self) -> Result<(), SubmissionError> {
        match self.first_error() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Builds and submits label mutations for accounts
#[derive(Debug, Clone, Default)]
pub struct LabelMutationController {
    universe: LabelUniverse,
}

impl LabelMutationController {
    /// Create a controller managing `universe`
    pub fn new(universe: LabelUniverse) -> Self {
        Self { universe }
    }

    /// The managed label values
    pub fn universe(&self) -> &LabelUniverse {
        &self.universe
    }

    /// Request negating every managed label
    pub fn delete_request(&self, action: LabelAction, subject: &str) -> LabelMutationRequest {
        LabelMutationRequest {
            action,
            subject: subject.to_string(),
            create_labels: BTreeSet::new(),
            negate_labels: self.universe.to_set(),
        }
    }

    /// Request creating the tier labels and the verified label
    pub fn add_request(
        &self,
        action: LabelAction,
        subject: &str,
        signals: &ProfileSignals,
    ) -> LabelMutationRequest {
        let create_labels = signals
            .tier_labels()
            .into_iter()
            .chain([VERIFIED_LABEL])
            .map(str::to_string)
            .collect();
        LabelMutationRequest {
            action,
            subject: subject.to_string(),
            create_labels,
            negate_labels: BTreeSet::new(),
        }
    }

    /// Requests for an action, in the order they must be submitted
    pub fn plan(
        &self,
        action: LabelAction,
        subject: &str,
        signals: &ProfileSignals,
    ) -> Vec<LabelMutationRequest> {
        match action {
            LabelAction::Delete => vec![self.delete_request(action, subject)],
            LabelAction::Add => vec![self.add_request(action, subject, signals)],
            LabelAction::Update => vec![
                self.delete_request(action, subject),
                self.add_request(action, subject, signals),
            ],
        }
    }

    /// Submit the planned requests one at a time
    ///
    /// Each request is awaited before the next starts. After a failure the
    /// remaining requests are reported as skipped rather than submitted, so a
    /// create never lands on a subject whose negate was lost.
    pub async fn apply(
        &self,
        store: &dyn LabelStoreClient,
        action: LabelAction,
        subject: &str,
        signals: &ProfileSignals,
    ) -> MutationReport {
        let mut steps = Vec::new();
        let mut failed = false;

        for request in self.plan(action, subject, signals) {
            let status = if failed {
                StepStatus::Skipped
            } else {
                match store.submit(&request).await {
                    Ok(()) => {
                        tracing::info!(
                            %action,
                            subject,
                            create = ?request.create_labels(),
                            negate = request.negate_labels().len(),
                            "label mutation submitted"
                        );
                        StepStatus::Submitted
                    }
                    Err(e) => {
                        tracing::error!(%action, subject, error = %e, "label mutation failed");
                        failed = true;
                        StepStatus::Failed(e)
                    }
                }
            };
            if status == StepStatus::Skipped {
                tracing::warn!(%action, subject, "label mutation skipped after earlier failure");
            }
            steps.push(StepOutcome { request, status });
        }

        MutationReport { action, steps }
    }
}
