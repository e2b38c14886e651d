//! Label decisions and label mutations
//!
//! Posts are checked against trust-and-safety rules, news source domains and
//! a set of reference images to decide which labels they get. Accounts are
//! labeled from publication signals through add, delete and update
//! mutations against an Ozone label store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bsky;
pub mod decision;
pub mod error;
pub mod labels;
pub mod matching;
pub mod mutation;
pub mod rules;
pub mod tiers;

pub use bsky::{OzoneLabelStore, XrpcContentResolver};
pub use decision::{
    CheckOutcome, ContentResolver, DecisionReport, ImageSimilarityMatcher, LabelDecision,
    LabelDecisionEngine, ModerationTarget,
};
pub use error::{ConfigError, ResolveError, SubmissionError};
pub use labels::{
    label_definitions, LabelDefinition, LabelUniverse, CATEGORY_LABEL, TRUST_AND_SAFETY_LABEL,
    VERIFIED_LABEL,
};
pub use matching::{NewsSourceMatcher, TextRuleMatcher, TrustAndSafetyMatch};
pub use mutation::{
    LabelAction, LabelMutationController, LabelMutationRequest, LabelStoreClient,
    MutationReport, StepOutcome, StepStatus,
};
pub use rules::{InputLayout, NewsDomainMap, RuleSet};
pub use tiers::{
    publication_count_tier, year_span_tier, ProfileSignals, PublicationCountTier, YearSpanTier,
};
