//! Post moderation and label events
//!
//! [`Labeler`] ties the decision engine and the mutation controller together
//! behind the two entry points the binary exposes.

use atproto_client::Did;
use moderation::{
    ConfigError, ContentResolver, DecisionReport, LabelAction, LabelDecisionEngine,
    LabelMutationController, LabelStoreClient, LabelUniverse, MutationReport, ProfileSignals,
};
use serde::{Deserialize, Serialize};

use crate::config::LabelerConfig;

/// A request to change an account's labels
///
/// ```json
/// {"action": "update", "did": "did:plc:abc", "labels": {"numPublications": 42}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    /// `add`, `delete` or `update`
    pub action: String,
    /// Account DID
    pub did: String,
    /// Publication signals; ignored for deletes
    #[serde(default)]
    pub labels: ProfileSignals,
}

impl LabelEvent {
    /// Parsed action
    pub fn action(&self) -> Result<LabelAction, ConfigError> {
        self.action.parse()
    }

    /// Validated subject
    pub fn subject(&self) -> Result<Did, ConfigError> {
        Did::new(self.did.trim()).map_err(|_| ConfigError::InvalidSubject(self.did.clone()))
    }

    /// Action and subject, checked before any input is loaded or the store
    /// is contacted
    pub fn validate(&self) -> Result<(LabelAction, Did), ConfigError> {
        Ok((self.action()?, self.subject()?))
    }
}

/// Label decisions for posts and label mutations for accounts
pub struct Labeler {
    engine: LabelDecisionEngine,
    controller: LabelMutationController,
}

impl Labeler {
    /// Wrap an engine; configured news labels join the managed universe
    pub fn new(engine: LabelDecisionEngine) -> Self {
        let universe =
            LabelUniverse::standard().with_labels(engine.news_domains().source_labels());
        Self {
            engine,
            controller: LabelMutationController::new(universe),
        }
    }

    /// Load every input named by `config`
    pub fn from_config(config: &LabelerConfig) -> Result<Self, ConfigError> {
        let engine = LabelDecisionEngine::from_input_dir(&config.input_dir)?;
        let labeler = Self::new(engine);
        tracing::info!(
            input_dir = %config.input_dir.display(),
            managed_labels = labeler.controller.universe().len(),
            "labeler ready"
        );
        Ok(labeler)
    }

    /// The decision engine
    pub fn engine(&self) -> &LabelDecisionEngine {
        &self.engine
    }

    /// The mutation controller
    pub fn controller(&self) -> &LabelMutationController {
        &self.controller
    }

    /// Decide the labels for one post
    pub async fn moderate_post(
        &self,
        resolver: &dyn ContentResolver,
        reference: &str,
    ) -> DecisionReport {
        self.engine.moderate(resolver, reference).await
    }

    /// Validate an event and run its mutation sequence
    ///
    /// An invalid action or subject is rejected before the store is
    /// contacted. Store failures are reported in the returned report.
    pub async fn handle_event(
        &self,
        store: &dyn LabelStoreClient,
        event: &LabelEvent,
    ) -> Result<MutationReport, ConfigError> {
        let (action, subject) = event.validate()?;
        Ok(self
            .controller
            .apply(store, action, subject.as_str(), &event.labels)
            .await)
    }
}
