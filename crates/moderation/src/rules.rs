//! Rule listings
//!
//! Trust-and-safety words and domains come from single-column CSV listings,
//! news sources from a two-column `Domain,Source` listing. Each listing has a
//! header row. Values are trimmed and lowercased on load, and rows whose
//! first column is blank are dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Result type for rule loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// File name of the trust-and-safety word listing
pub const TS_WORDS_FILE: &str = "t-and-s-words.csv";
/// File name of the trust-and-safety domain listing
pub const TS_DOMAINS_FILE: &str = "t-and-s-domains.csv";
/// File name of the news domain listing
pub const NEWS_DOMAINS_FILE: &str = "news-domains.csv";
/// Directory holding the category reference images
pub const REFERENCE_IMAGES_DIR: &str = "dog-list-images";

/// Trust-and-safety keywords and domains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    keywords: BTreeSet<String>,
    domains: BTreeSet<String>,
}

impl RuleSet {
    /// Build a rule set from raw values, normalising and dropping blanks
    pub fn new<K, D>(keywords: K, domains: D) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            keywords: normalize_all(keywords),
            domains: normalize_all(domains),
        }
    }

    /// Load both single-column listings
    pub fn load(words_path: impl AsRef<Path>, domains_path: impl AsRef<Path>) -> Result<Self> {
        let keywords = read_first_column(words_path.as_ref())?;
        let domains = read_first_column(domains_path.as_ref())?;
        Ok(Self::new(keywords, domains))
    }

    /// Keywords, lowercased and trimmed
    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    /// Domains, lowercased and trimmed
    pub fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }
}

/// Mapping from a news domain to its source label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsDomainMap {
    sources: BTreeMap<String, String>,
}

impl NewsDomainMap {
    /// Build a map from `(domain, source)` pairs
    ///
    /// Domains are normalised; a later pair for the same domain replaces an
    /// earlier one. Pairs with a blank domain or blank source are dropped.
    pub fn new<I, D, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, S)>,
        D: AsRef<str>,
        S: AsRef<str>,
    {
        let sources = pairs
            .into_iter()
            .filter_map(|(domain, source)| {
                let domain = normalize(domain.as_ref())?;
                let source = source.as_ref().trim();
                (!source.is_empty()).then(|| (domain, source.to_string()))
            })
            .collect();
        Self { sources }
    }

    /// Load a `Domain,Source` listing
    ///
    /// Columns are located by header name (case-insensitive); a listing
    /// without those headers is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = open_listing(path)?;

        let headers = reader.headers().map_err(|source| listing_error(path, source))?;
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| ConfigError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name,
                })
        };
        let domain_column = column("Domain")?;
        let source_column = column("Source")?;

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| listing_error(path, source))?;
            pairs.push((
                record.get(domain_column).unwrap_or_default().to_string(),
                record.get(source_column).unwrap_or_default().to_string(),
            ));
        }
        Ok(Self::new(pairs))
    }

    /// Source label for an exact domain
    pub fn source_for(&self, domain: &str) -> Option<&str> {
        self.sources.get(domain).map(String::as_str)
    }

    /// `(domain, source)` pairs in domain order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources.iter().map(|(d, s)| (d.as_str(), s.as_str()))
    }

    /// Distinct source labels
    pub fn source_labels(&self) -> BTreeSet<&str> {
        self.sources.values().map(String::as_str).collect()
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the map has no domains
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Paths of every input the labeler reads from one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayout {
    /// Trust-and-safety words
    pub ts_words: PathBuf,
    /// Trust-and-safety domains
    pub ts_domains: PathBuf,
    /// News domains
    pub news_domains: PathBuf,
    /// Reference images for the category label
    pub reference_images: PathBuf,
}

impl InputLayout {
    /// Standard file names under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            ts_words: dir.join(TS_WORDS_FILE),
            ts_domains: dir.join(TS_DOMAINS_FILE),
            news_domains: dir.join(NEWS_DOMAINS_FILE),
            reference_images: dir.join(REFERENCE_IMAGES_DIR),
        }
    }
}

fn normalize(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_lowercase())
}

fn normalize_all<I>(values: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    values
        .into_iter()
        .filter_map(|v| normalize(v.as_ref()))
        .collect()
}

fn open_listing(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    if !path.is_file() {
        return Err(ConfigError::MissingInput(path.to_path_buf()));
    }
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| listing_error(path, source))
}

fn read_first_column(path: &Path) -> Result<Vec<String>> {
    let mut reader = open_listing(path)?;
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| listing_error(path, source))?;
        if let Some(value) = record.get(0) {
            values.push(value.to_string());
        }
    }
    tracing::debug!(path = %path.display(), rows = values.len(), "listing loaded");
    Ok(values)
}

fn listing_error(path: &Path, source: csv::Error) -> ConfigError {
    ConfigError::Listing {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_rule_set_normalizes_and_drops_blanks() {
        let rules = RuleSet::new(["  Banned Keyword ", "", "   ", "SCAM"], ["Evil.EXAMPLE "]);
        assert_eq!(
            rules.keywords().iter().collect::<Vec<_>>(),
            vec!["banned keyword", "scam"]
        );
        assert!(rules.domains().contains("evil.example"));
    }

    #[test]
    fn test_load_single_column_listings() {
        let dir = tempfile::tempdir().unwrap();
        let words = write(dir.path(), TS_WORDS_FILE, "Word,Notes\nScam, fraud\n,\n  Spam  ,\n\"buy, now\",x\n");
        let domains = write(dir.path(), TS_DOMAINS_FILE, "Domain\nbad.example\n");

        let rules = RuleSet::load(&words, &domains).unwrap();
        assert_eq!(
            rules.keywords().iter().collect::<Vec<_>>(),
            vec!["buy, now", "scam", "spam"]
        );
        assert_eq!(rules.domains().len(), 1);
    }

    #[test]
    fn test_missing_listing_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuleSet::load(dir.path().join("nope.csv"), dir.path().join("nope2.csv"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingInput(_)));
    }

    #[test]
    fn test_load_news_domains() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            NEWS_DOMAINS_FILE,
            "Source,Domain\nnyt,NYTimes.com\nnyt,nyti.ms\nbbc, bbc.co.uk \nghost,\n,orphan.example\n",
        );

        let news = NewsDomainMap::load(&path).unwrap();
        assert_eq!(news.len(), 3);
        assert_eq!(news.source_for("nytimes.com"), Some("nyt"));
        assert_eq!(news.source_for("bbc.co.uk"), Some("bbc"));
        assert_eq!(news.source_for("orphan.example"), None);
        assert_eq!(news.source_labels().into_iter().collect::<Vec<_>>(), vec!["bbc", "nyt"]);
    }

    #[test]
    fn test_news_listing_without_source_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), NEWS_DOMAINS_FILE, "Domain,Outlet\ncnn.com,cnn\n");
        let err = NewsDomainMap::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::MissingColumn { column: "Source", .. }));
    }

    #[test]
    fn test_news_map_last_pair_wins() {
        let news = NewsDomainMap::new([("apnews.com", "ap"), ("APNEWS.com", "associated-press")]);
        assert_eq!(news.len(), 1);
        assert_eq!(news.source_for("apnews.com"), Some("associated-press"));
    }

    #[test]
    fn test_input_layout() {
        let layout = InputLayout::in_dir("/data/input");
        assert_eq!(layout.ts_words, PathBuf::from("/data/input/t-and-s-words.csv"));
        assert_eq!(layout.reference_images, PathBuf::from("/data/input/dog-list-images"));
    }
}
