//! Label decisions for posts
//!
//! The engine combines the trust-and-safety matcher, the news source matcher
//! and the image similarity matcher into one ordered label list. Upstream
//! failures never abort a decision: each sub-check reports whether it ran,
//! and an unavailable check simply contributes no labels.

use async_trait::async_trait;
use atproto_client::{AtUri, Did};
use media_processing::{HashError, PerceptualHash, ReferenceHashIndex};
use std::path::Path;
use std::sync::Arc;

use crate::error::{ConfigError, ResolveError};
use crate::labels::{CATEGORY_LABEL, TRUST_AND_SAFETY_LABEL};
use crate::matching::{NewsSourceMatcher, TextRuleMatcher, TrustAndSafetyMatch};
use crate::rules::{InputLayout, NewsDomainMap, RuleSet};

/// Source of post text and embedded images
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Post text, as written
    async fn fetch_text(&self, reference: &str) -> Result<String, ResolveError>;

    /// Encoded bytes of each embedded image that could be downloaded
    async fn fetch_embedded_images(&self, reference: &str) -> Result<Vec<Vec<u8>>, ResolveError>;

    /// Account that owns the post
    ///
    /// Only `at://` references carry the author directly; resolvers that can
    /// look authors up override this.
    async fn fetch_author(&self, reference: &str) -> Result<Did, ResolveError> {
        Ok(reference.trim().parse::<AtUri>()?.did)
    }
}

/// Content under evaluation
///
/// `None` for text or images means the collaborator could not provide them,
/// which is different from a post that has no text or no images. A missing
/// author never affects the decision; it only leaves the post unattributed
/// in logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationTarget {
    /// Post reference the content came from
    pub reference: String,
    /// Account that owns the post, when known
    pub author: Option<Did>,
    /// Lowercased post text
    pub text: Option<String>,
    /// Encoded embedded images, in post order
    pub images: Option<Vec<Vec<u8>>>,
}

impl ModerationTarget {
    /// Target with text and no images
    pub fn new(reference: impl Into<String>, text: &str) -> Self {
        Self {
            reference: reference.into(),
            author: None,
            text: Some(text.to_lowercase()),
            images: Some(Vec::new()),
        }
    }

    /// Attribute the post to an account
    pub fn with_author(mut self, author: Did) -> Self {
        self.author = Some(author);
        self
    }

    /// Add an embedded image
    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.images.get_or_insert_with(Vec::new).push(bytes);
        self
    }

    /// Fetch text and images through a resolver
    pub async fn resolve(resolver: &dyn ContentResolver, reference: &str) -> Self {
        let text = match resolver.fetch_text(reference).await {
            Ok(text) => Some(text.to_lowercase()),
            Err(e) => {
                tracing::warn!(reference, error = %e, "post text unavailable");
                None
            }
        };
        let images = match resolver.fetch_embedded_images(reference).await {
            Ok(images) => Some(images),
            Err(e) => {
                tracing::warn!(reference, error = %e, "post images unavailable");
                None
            }
        };
        let author = match resolver.fetch_author(reference).await {
            Ok(did) => Some(did),
            Err(e) => {
                tracing::debug!(reference, error = %e, "post author unknown");
                None
            }
        };
        Self {
            reference: reference.to_string(),
            author,
            text,
            images,
        }
    }
}

/// Outcome of one sub-check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The check ran and produced labels
    Matched,
    /// The check ran and produced nothing
    NotMatched,
    /// The check could not run on this content
    Unavailable,
}

/// Ordered label values for one target; duplicates are kept
pub type LabelDecision = Vec<String>;

/// A decision together with the outcome of each sub-check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionReport {
    /// Labels in order: trust-and-safety, news sources, category
    pub labels: LabelDecision,
    /// Trust-and-safety check
    pub trust_and_safety: CheckOutcome,
    /// News source check
    pub news_sources: CheckOutcome,
    /// Image category check
    pub category: CheckOutcome,
}

impl DecisionReport {
    /// Whether any sub-check could not run
    pub fn is_degraded(&self) -> bool {
        [self.trust_and_safety, self.news_sources, self.category].contains(&CheckOutcome::Unavailable)
    }

    /// The label list alone
    pub fn into_labels(self) -> LabelDecision {
        self.labels
    }
}

/// Tests images against the reference hash index
#[derive(Debug, Clone)]
pub struct ImageSimilarityMatcher {
    index: Arc<ReferenceHashIndex>,
}

impl ImageSimilarityMatcher {
    /// Create a matcher over a shared index
    pub fn new(index: Arc<ReferenceHashIndex>) -> Self {
        Self { index }
    }

    /// Whether the image is within the similarity threshold of any reference
    pub fn matches_reference_category(&self, image: &[u8]) -> Result<bool, HashError> {
        let hash = PerceptualHash::from_image_bytes(image)?;
        let matched = self.index.contains_similar(&hash);
        if matched {
            tracing::debug!(%hash, distance = ?self.index.nearest_distance(&hash), "reference image match");
        }
        Ok(matched)
    }

    /// Scan images in order, stopping at the first match
    ///
    /// Images that fail to decode are skipped. The scan is unavailable only
    /// when there were images and none of them could be hashed.
    pub fn scan(&self, images: &[Vec<u8>]) -> CheckOutcome {
        let mut hashed_any = false;
        for (position, image) in images.iter().enumerate() {
            match self.matches_reference_category(image) {
                Ok(true) => return CheckOutcome::Matched,
                Ok(false) => hashed_any = true,
                Err(e) => tracing::warn!(position, error = %e, "skipping embedded image"),
            }
        }
        if images.is_empty() || hashed_any {
            CheckOutcome::NotMatched
        } else {
            CheckOutcome::Unavailable
        }
    }
}

/// Turns post content into label values
///
/// Holds only immutable shared state, so one engine can serve concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct LabelDecisionEngine {
    text: TextRuleMatcher,
    news: NewsSourceMatcher,
    images: ImageSimilarityMatcher,
    news_map: Arc<NewsDomainMap>,
}

impl LabelDecisionEngine {
    /// Assemble an engine from loaded inputs
    pub fn new(rules: RuleSet, news: NewsDomainMap, index: ReferenceHashIndex) -> Self {
        let news_map = Arc::new(news);
        Self {
            text: TextRuleMatcher::new(Arc::new(rules)),
            news: NewsSourceMatcher::new(Arc::clone(&news_map)),
            images: ImageSimilarityMatcher::new(Arc::new(index)),
            news_map,
        }
    }

    /// Load every input from the standard layout under `dir`
    pub fn from_input_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let layout = InputLayout::in_dir(dir);
        let rules = RuleSet::load(&layout.ts_words, &layout.ts_domains)?;
        let news = NewsDomainMap::load(&layout.news_domains)?;
        if !layout.reference_images.is_dir() {
            return Err(ConfigError::MissingInput(layout.reference_images));
        }
        let index = ReferenceHashIndex::load_dir(&layout.reference_images)?;

        tracing::info!(
            keywords = rules.keywords().len(),
            domains = rules.domains().len(),
            news_domains = news.len(),
            reference_images = index.len(),
            "labeling rules loaded"
        );
        Ok(Self::new(rules, news, index))
    }

    /// News domain map, for extending the label universe
    pub fn news_domains(&self) -> &NewsDomainMap {
        &self.news_map
    }

    /// Decide labels for already-resolved content
    pub fn decide(&self, target: &ModerationTarget) -> DecisionReport {
        let mut labels = Vec::new();

        let (trust_and_safety, news_sources) = match target.text.as_deref() {
            Some(text) => {
                let trust_and_safety = match self.text.classify(text) {
                    TrustAndSafetyMatch::None => CheckOutcome::NotMatched,
                    reason => {
                        tracing::info!(reference = %target.reference, ?reason, "trust-and-safety match");
                        labels.push(TRUST_AND_SAFETY_LABEL.to_string());
                        CheckOutcome::Matched
                    }
                };

                let sources = self.news.match_news_sources(text);
                let news_sources = if sources.is_empty() {
                    CheckOutcome::NotMatched
                } else {
                    tracing::info!(reference = %target.reference, ?sources, "news source match");
                    labels.extend(sources);
                    CheckOutcome::Matched
                };
                (trust_and_safety, news_sources)
            }
            None => (CheckOutcome::Unavailable, CheckOutcome::Unavailable),
        };

        let category = match target.images.as_deref() {
            Some(images) => self.images.scan(images),
            None => CheckOutcome::Unavailable,
        };
        if category == CheckOutcome::Matched {
            tracing::info!(reference = %target.reference, "category image match");
            labels.push(CATEGORY_LABEL.to_string());
        }

        DecisionReport {
            labels,
            trust_and_safety,
            news_sources,
            category,
        }
    }

    /// Resolve a post and decide its labels
    pub async fn moderate(&self, resolver: &dyn ContentResolver, reference: &str) -> DecisionReport {
        let target = ModerationTarget::resolve(resolver, reference).await;
        let report = self.decide(&target);
        let author = target.author.as_ref().map(Did::as_str);
        tracing::info!(reference, ?author, labels = ?report.labels, degraded = report.is_degraded(), "decision");
        report
    }
}
