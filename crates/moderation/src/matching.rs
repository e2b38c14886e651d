//! Text rule matching
//!
//! All matching is plain substring search over text that the caller has
//! already lowercased; rule values are lowercased on load.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::rules::{NewsDomainMap, RuleSet};

/// Why text matched the trust-and-safety rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustAndSafetyMatch {
    /// A keyword occurs in the text
    Keyword(String),
    /// No keyword occurs, but a domain does
    Domain(String),
    /// Neither keywords nor domains occur
    None,
}

impl TrustAndSafetyMatch {
    /// Whether the text matched at all
    pub fn is_match(&self) -> bool {
        !matches!(self, TrustAndSafetyMatch::None)
    }
}

/// Trust-and-safety keyword and domain matcher
#[derive(Debug, Clone)]
pub struct TextRuleMatcher {
    rules: Arc<RuleSet>,
}

impl TextRuleMatcher {
    /// Create a matcher over shared rules
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Classify text, checking domains only when no keyword matched
    pub fn classify(&self, text: &str) -> TrustAndSafetyMatch {
        if let Some(keyword) = self.rules.keywords().iter().find(|k| text.contains(k.as_str())) {
            return TrustAndSafetyMatch::Keyword(keyword.clone());
        }
        if let Some(domain) = self.rules.domains().iter().find(|d| text.contains(d.as_str())) {
            return TrustAndSafetyMatch::Domain(domain.clone());
        }
        TrustAndSafetyMatch::None
    }

    /// Whether the trust-and-safety label applies to `text`
    pub fn match_trust_and_safety(&self, text: &str) -> bool {
        self.classify(text).is_match()
    }
}

/// Maps news domains mentioned in text to their source labels
#[derive(Debug, Clone)]
pub struct NewsSourceMatcher {
    news: Arc<NewsDomainMap>,
}

impl NewsSourceMatcher {
    /// Create a matcher over a shared domain map
    pub fn new(news: Arc<NewsDomainMap>) -> Self {
        Self { news }
    }

    /// Source labels for every mapped domain occurring in `text`
    pub fn match_news_sources(&self, text: &str) -> BTreeSet<String> {
        self.news
            .iter()
            .filter(|(domain, _)| text.contains(domain))
            .map(|(_, source)| source.to_string())
            .collect()
    }
}
