//! Label values and label definitions
//!
//! Every label value this labeler can emit is declared here. The full set is
//! the [`LabelUniverse`], which is what a delete negates so that no stale
//! value survives on a subject.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::tiers::{PublicationCountTier, YearSpanTier};

/// Label for policy-violating content
pub const TRUST_AND_SAFETY_LABEL: &str = "t-and-s";

/// Label for posts whose images resemble the reference set
pub const CATEGORY_LABEL: &str = "dog";

/// Label for accounts verified as scientists
pub const VERIFIED_LABEL: &str = "verified-scientist";

/// The complete set of label values the labeler manages on a subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelUniverse {
    values: BTreeSet<String>,
}

impl LabelUniverse {
    /// Every statically known value: count tiers, year tiers, the verified
    /// label, the trust-and-safety label and the category label
    pub fn standard() -> Self {
        let values = PublicationCountTier::ALL
            .iter()
            .map(|tier| tier.label())
            .chain(YearSpanTier::ALL.iter().map(|tier| tier.label()))
            .chain([VERIFIED_LABEL, TRUST_AND_SAFETY_LABEL, CATEGORY_LABEL])
            .map(str::to_string)
            .collect();
        Self { values }
    }

    /// Extend the universe with configured values (news source labels)
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Whether `label` belongs to the universe
    pub fn contains(&self, label: &str) -> bool {
        self.values.contains(label)
    }

    /// Values in lexical order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the universe is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Owned copy of the values
    pub fn to_set(&self) -> BTreeSet<String> {
        self.values.clone()
    }
}

impl Default for LabelUniverse {
    fn default() -> Self {
        Self::standard()
    }
}

/// How prominently a client should present a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSeverity {
    /// Informational badge
    Inform,
    /// Warning
    Alert,
    /// No presentation
    None,
}

/// What a client should blur when the label is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelBlurs {
    /// Blur the whole content
    Content,
    /// Blur media only
    Media,
    /// Blur nothing
    None,
}

/// Client default for a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSetting {
    /// Ignore the label
    Ignore,
    /// Show a warning
    Warn,
    /// Hide the content
    Hide,
}

/// Localized label information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelLocale {
    /// Language code (e.g., "en")
    pub lang: String,
    /// Localized name
    pub name: String,
    /// Localized description
    pub description: String,
}

/// Published definition of a label value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDefinition {
    /// Label value
    pub identifier: String,
    /// Presentation severity
    pub severity: LabelSeverity,
    /// Blurring behaviour
    pub blurs: LabelBlurs,
    /// Default client setting
    pub default_setting: LabelSetting,
    /// Restricted to adult-content-enabled viewers
    #[serde(default)]
    pub adult_only: bool,
    /// Localized strings
    pub locales: Vec<LabelLocale>,
}

impl LabelDefinition {
    /// Informational account badge with a single English locale
    pub fn badge(
        identifier: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            severity: LabelSeverity::Inform,
            blurs: LabelBlurs::None,
            default_setting: LabelSetting::Warn,
            adult_only: false,
            locales: vec![LabelLocale {
                lang: "en".to_string(),
                name: name.into(),
                description: description.into(),
            }],
        }
    }

    /// Localized name, falling back to the first locale
    pub fn name(&self, lang: &str) -> Option<&str> {
        self.locales
            .iter()
            .find(|l| l.lang == lang)
            .or_else(|| self.locales.first())
            .map(|l| l.name.as_str())
    }
}

/// Definitions for every account label the labeler emits
pub fn label_definitions() -> Vec<LabelDefinition> {
    let mut definitions = vec![LabelDefinition::badge(
        VERIFIED_LABEL,
        "Verified Scientist 🔬",
        "This account has been verified as a scientist through ORCID",
    )];

    definitions.extend(PublicationCountTier::ALL.iter().map(|tier| {
        let range = tier.range_text();
        LabelDefinition::badge(
            tier.label(),
            format!("{range} Publications 📚"),
            format!("This scientist has published {range} papers"),
        )
    }));

    definitions.extend(YearSpanTier::ALL.iter().map(|tier| {
        let range = tier.range_text();
        LabelDefinition::badge(
            tier.label(),
            format!("{range} Years Publishing 📅"),
            format!("This scientist has been publishing for {range} years"),
        )
    }));

    definitions
}
