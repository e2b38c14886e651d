//! Feed and identity lookups
//!
//! Response shapes for `com.atproto.identity.resolveHandle` and
//! `app.bsky.feed.getPosts`. Views returned by the AppView are loosely
//! shaped (records and embeds vary by post type), so everything the labeler
//! does not strictly need is optional and absence is never an error.

use serde::{Deserialize, Serialize};

use crate::types::{Actor, AtUri, Did, PostUrl};
use crate::xrpc::{XrpcClient, XrpcRequest};
use crate::{Error, Result};

/// Output of `com.atproto.identity.resolveHandle`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveHandleOutput {
    /// DID the handle points at
    pub did: String,
}

/// Output of `app.bsky.feed.getPosts`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetPostsOutput {
    /// Hydrated posts; missing URIs are silently omitted by the server
    #[serde(default)]
    pub posts: Vec<PostView>,
}

/// Hydrated view of a single post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    /// AT-URI of the post
    pub uri: String,
    /// Raw post record; `None` when the AppView omits it
    #[serde(default)]
    pub record: Option<PostRecord>,
    /// Hydrated embed; `None` for text-only posts
    #[serde(default)]
    pub embed: Option<EmbedView>,
}

impl PostView {
    /// Post text, empty when the record carries none
    pub fn text(&self) -> &str {
        self.record
            .as_ref()
            .and_then(|r| r.text.as_deref())
            .unwrap_or_default()
    }

    /// Full-size URLs of embedded images, in post order
    ///
    /// Covers plain image embeds and the media half of record-with-media
    /// embeds. Any other embed type contributes nothing.
    pub fn image_urls(&self) -> Vec<String> {
        let Some(embed) = &self.embed else {
            return Vec::new();
        };
        let images = embed
            .images
            .as_deref()
            .or_else(|| embed.media.as_ref().and_then(|m| m.images.as_deref()))
            .unwrap_or_default();
        images.iter().map(|image| image.fullsize.clone()).collect()
    }
}

/// The subset of `app.bsky.feed.post` the labeler reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    /// Post body
    #[serde(default)]
    pub text: Option<String>,
}

/// Hydrated embed (`app.bsky.embed.*#view`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedView {
    /// Present on `app.bsky.embed.images#view`
    #[serde(default)]
    pub images: Option<Vec<ImageView>>,
    /// Present on `app.bsky.embed.recordWithMedia#view`
    #[serde(default)]
    pub media: Option<Box<EmbedView>>,
}

/// One image inside an images embed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageView {
    /// Thumbnail URL
    #[serde(default)]
    pub thumb: Option<String>,
    /// Full-size URL
    pub fullsize: String,
    /// Alt text
    #[serde(default)]
    pub alt: Option<String>,
}

impl XrpcClient {
    /// Resolve a handle to its DID
    pub async fn resolve_handle(&self, handle: &str) -> Result<Did> {
        let request =
            XrpcRequest::query("com.atproto.identity.resolveHandle").param("handle", handle);
        let response = self.query::<ResolveHandleOutput>(request).await?;
        Did::new(response.data.did)
    }

    /// Turn a `bsky.app` post link into the post's AT-URI
    pub async fn resolve_post_url(&self, url: &PostUrl) -> Result<AtUri> {
        let did = match &url.actor {
            Actor::Did(did) => did.clone(),
            Actor::Handle(handle) => self.resolve_handle(handle).await?,
        };
        Ok(AtUri::post(did, url.rkey.clone()))
    }

    /// Fetch a single hydrated post
    pub async fn get_post(&self, uri: &AtUri) -> Result<PostView> {
        let request = XrpcRequest::query("app.bsky.feed.getPosts").param("uris", uri.to_string());
        let response = self.query::<GetPostsOutput>(request).await?;
        response
            .data
            .posts
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no post returned for {uri}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_view_with_images() {
        let json = r#"{
            "uri": "at://did:plc:a/app.bsky.feed.post/1",
            "cid": "bafy",
            "record": {"$type": "app.bsky.feed.post", "text": "Look at my Dog", "createdAt": "2024-01-01T00:00:00Z"},
            "embed": {
                "$type": "app.bsky.embed.images#view",
                "images": [
                    {"thumb": "https://cdn/thumb/1", "fullsize": "https://cdn/full/1", "alt": ""},
                    {"thumb": "https://cdn/thumb/2", "fullsize": "https://cdn/full/2", "alt": ""}
                ]
            }
        }"#;

        let post: PostView = serde_json::from_str(json).unwrap();
        assert_eq!(post.text(), "Look at my Dog");
        assert_eq!(
            post.image_urls(),
            vec!["https://cdn/full/1".to_string(), "https://cdn/full/2".to_string()]
        );
    }

    #[test]
    fn test_post_view_record_with_media() {
        let json = r#"{
            "uri": "at://did:plc:a/app.bsky.feed.post/1",
            "record": {"text": "quote"},
            "embed": {
                "$type": "app.bsky.embed.recordWithMedia#view",
                "record": {},
                "media": {"images": [{"fullsize": "https://cdn/full/9"}]}
            }
        }"#;

        let post: PostView = serde_json::from_str(json).unwrap();
        assert_eq!(post.image_urls(), vec!["https://cdn/full/9".to_string()]);
    }

    #[test]
    fn test_post_view_missing_fields() {
        let post: PostView =
            serde_json::from_str(r#"{"uri": "at://did:plc:a/app.bsky.feed.post/1"}"#).unwrap();
        assert_eq!(post.text(), "");
        assert!(post.image_urls().is_empty());
    }

    #[test]
    fn test_external_embed_has_no_images() {
        let json = r#"{
            "uri": "at://did:plc:a/app.bsky.feed.post/1",
            "embed": {"$type": "app.bsky.embed.external#view", "external": {"uri": "https://news.example"}}
        }"#;
        let post: PostView = serde_json::from_str(json).unwrap();
        assert!(post.image_urls().is_empty());
    }
}
