//! Core AT Protocol identifier types

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Collection NSID for feed posts
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Decentralized identifier (`did:<method>:<id>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Did(String);

impl Did {
    /// Validate and wrap a DID string
    pub fn new(did: impl Into<String>) -> Result<Self> {
        let did = did.into();
        let mut parts = did.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("did"), Some(method), Some(id))
                if !method.is_empty()
                    && method.chars().all(|c| c.is_ascii_lowercase())
                    && !id.is_empty() =>
            {
                Ok(Self(did))
            }
            _ => Err(Error::InvalidInput(format!("not a DID: {did}"))),
        }
    }

    /// The DID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Either a handle or a DID, as it appears in a profile URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// `alice.bsky.social`
    Handle(String),
    /// `did:plc:...`
    Did(Did),
}

impl Actor {
    /// Classify a profile path segment
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.starts_with("did:") {
            return Did::new(value).map(Actor::Did);
        }
        if value.is_empty() || !value.contains('.') {
            return Err(Error::InvalidInput(format!("not a handle: {value}")));
        }
        Ok(Actor::Handle(value.to_lowercase()))
    }
}

/// A web link to a post: `https://bsky.app/profile/<actor>/post/<rkey>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUrl {
    /// Author of the post
    pub actor: Actor,
    /// Record key of the post
    pub rkey: String,
}

impl FromStr for PostUrl {
    type Err = Error;

    fn from_str(url: &str) -> Result<Self> {
        let (_, rest) = url
            .split_once("/profile/")
            .ok_or_else(|| Error::InvalidInput(format!("missing /profile/ in {url}")))?;
        let (actor, rest) = rest
            .split_once("/post/")
            .ok_or_else(|| Error::InvalidInput(format!("missing /post/ in {url}")))?;

        let rkey = rest
            .split(['?', '#', '/'])
            .next()
            .unwrap_or_default()
            .to_string();
        if rkey.is_empty() {
            return Err(Error::InvalidInput(format!("missing record key in {url}")));
        }

        Ok(Self {
            actor: Actor::parse(actor)?,
            rkey,
        })
    }
}

/// `at://<did>/<collection>/<rkey>` record URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUri {
    /// Repository DID
    pub did: Did,
    /// Collection NSID
    pub collection: String,
    /// Record key
    pub rkey: String,
}

impl AtUri {
    /// URI of a feed post
    pub fn post(did: Did, rkey: impl Into<String>) -> Self {
        Self {
            did,
            collection: POST_COLLECTION.to_string(),
            rkey: rkey.into(),
        }
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}/{}/{}", self.did, self.collection, self.rkey)
    }
}

impl FromStr for AtUri {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("at://")
            .ok_or_else(|| Error::InvalidInput(format!("not an at:// URI: {uri}")))?;
        let mut parts = rest.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(did), Some(collection), Some(rkey))
                if !collection.is_empty() && !rkey.is_empty() =>
            {
                Ok(Self {
                    did: Did::new(did)?,
                    collection: collection.to_string(),
                    rkey: rkey.to_string(),
                })
            }
            _ => Err(Error::InvalidInput(format!("incomplete at:// URI: {uri}"))),
        }
    }
}
