//! Publication tiers
//!
//! Profile signals from the publication-metadata service are bucketed into
//! ordinal tiers. Thresholds are checked from the highest tier down, so each
//! lower bound is inclusive.

use serde::{Deserialize, Serialize};

/// Bucket for the number of publications
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PublicationCountTier {
    /// 1–9 (and anything below 10)
    OneToNine,
    /// 10–49
    TenToFortyNine,
    /// 50–99
    FiftyToNinetyNine,
    /// 100–249
    OneHundredToTwoFortyNine,
    /// 250 or more
    TwoFiftyOrMore,
}

impl PublicationCountTier {
    /// All tiers, lowest first
    pub const ALL: [PublicationCountTier; 5] = [
        PublicationCountTier::OneToNine,
        PublicationCountTier::TenToFortyNine,
        PublicationCountTier::FiftyToNinetyNine,
        PublicationCountTier::OneHundredToTwoFortyNine,
        PublicationCountTier::TwoFiftyOrMore,
    ];

    /// Tier for a publication count
    pub fn from_count(count: u32) -> Self {
        match count {
            n if n >= 250 => Self::TwoFiftyOrMore,
            n if n >= 100 => Self::OneHundredToTwoFortyNine,
            n if n >= 50 => Self::FiftyToNinetyNine,
            n if n >= 10 => Self::TenToFortyNine,
            _ => Self::OneToNine,
        }
    }

    /// Label value for this tier
    pub fn label(&self) -> &'static str {
        match self {
            Self::OneToNine => "publications-one-nine",
            Self::TenToFortyNine => "publications-ten-fortynine",
            Self::FiftyToNinetyNine => "publications-fifty-ninetynine",
            Self::OneHundredToTwoFortyNine => "publications-onehundred-twofifty",
            Self::TwoFiftyOrMore => "publications-gte-twofifty",
        }
    }

    pub(crate) fn range_text(&self) -> &'static str {
        match self {
            Self::OneToNine => "1-9",
            Self::TenToFortyNine => "10-49",
            Self::FiftyToNinetyNine => "50-99",
            Self::OneHundredToTwoFortyNine => "100-249",
            Self::TwoFiftyOrMore => "250+",
        }
    }
}

/// Bucket for the span between first and latest publication year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum YearSpanTier {
    /// 0–4 years (and negative spans)
    ZeroToFour,
    /// 5–9 years
    FiveToNine,
    /// 10–19 years
    TenToNineteen,
    /// 20 years or more
    TwentyOrMore,
}

impl YearSpanTier {
    /// All tiers, lowest first
    pub const ALL: [YearSpanTier; 4] = [
        YearSpanTier::ZeroToFour,
        YearSpanTier::FiveToNine,
        YearSpanTier::TenToNineteen,
        YearSpanTier::TwentyOrMore,
    ];

    /// Tier for `last_year - first_year`
    pub fn from_years(first_year: i32, last_year: i32) -> Self {
        match last_year.saturating_sub(first_year) {
            span if span >= 20 => Self::TwentyOrMore,
            span if span >= 10 => Self::TenToNineteen,
            span if span >= 5 => Self::FiveToNine,
            _ => Self::ZeroToFour,
        }
    }

    /// Label value for this tier
    pub fn label(&self) -> &'static str {
        match self {
            Self::ZeroToFour => "publication-years-zero-four",
            Self::FiveToNine => "publication-years-five-nine",
            Self::TenToNineteen => "publication-years-ten-nineteen",
            Self::TwentyOrMore => "publication-years-gte-twenty",
        }
    }

    pub(crate) fn range_text(&self) -> &'static str {
        match self {
            Self::ZeroToFour => "0-4",
            Self::FiveToNine => "5-9",
            Self::TenToNineteen => "10-19",
            Self::TwentyOrMore => "20+",
        }
    }
}

/// Label value for a publication count
pub fn publication_count_tier(count: u32) -> &'static str {
    PublicationCountTier::from_count(count).label()
}

/// Label value for a publication year span
pub fn year_span_tier(first_year: i32, last_year: i32) -> &'static str {
    YearSpanTier::from_years(first_year, last_year).label()
}

/// Publication signals for an account
///
/// Every field is optional because the metadata lookup may not know it.
/// A missing or zero publication count produces no count tier, and a year
/// tier needs both years.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSignals {
    /// Number of publications
    #[serde(default)]
    pub num_publications: Option<u32>,
    /// Year of the first publication
    #[serde(default)]
    pub first_pub_year: Option<i32>,
    /// Year of the latest publication
    #[serde(default)]
    pub last_pub_year: Option<i32>,
}

impl ProfileSignals {
    /// Signals with a publication count only
    pub fn with_count(count: u32) -> Self {
        Self {
            num_publications: Some(count),
            ..Self::default()
        }
    }

    /// Set the publication year range
    pub fn years(mut self, first_year: i32, last_year: i32) -> Self {
        self.first_pub_year = Some(first_year);
        self.last_pub_year = Some(last_year);
        self
    }

    /// Tier labels these signals justify, count tier first
    pub fn tier_labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::with_capacity(2);
        if let Some(count) = self.num_publications.filter(|&n| n > 0) {
            labels.push(publication_count_tier(count));
        }
        if let (Some(first), Some(last)) = (self.first_pub_year, self.last_pub_year) {
            labels.push(year_span_tier(first, last));
        }
        labels
    }
}
