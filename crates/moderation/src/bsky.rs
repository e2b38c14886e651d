//! Bluesky-backed collaborators
//!
//! [`XrpcContentResolver`] reads posts from the AppView and
//! [`OzoneLabelStore`] writes account labels through the labeler's Ozone
//! service.

use async_trait::async_trait;
use atproto_client::feed::PostView;
use atproto_client::ozone::{EmitEventInput, ModEventLabel, RepoRef};
use atproto_client::{AtUri, Did, PostUrl, XrpcClient};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::decision::ContentResolver;
use crate::error::{ResolveError, SubmissionError};
use crate::mutation::{LabelMutationRequest, LabelStoreClient};

/// Reads post text and images over XRPC
///
/// References may be `bsky.app` post links or `at://` post URIs.
///
/// [`ContentResolver::fetch_text`] always fetches the post and remembers it;
/// image and author lookups for the same reference reuse that view, so one
/// resolution reads a single snapshot of the post.
pub struct XrpcContentResolver {
    client: XrpcClient,
    last_post: Mutex<Option<(String, PostView)>>,
}

impl XrpcContentResolver {
    /// Wrap a client pointed at an AppView or PDS
    pub fn new(client: XrpcClient) -> Self {
        Self {
            client,
            last_post: Mutex::new(None),
        }
    }

    async fn post(&self, reference: &str, refresh: bool) -> Result<PostView, ResolveError> {
        let mut last = self.last_post.lock().await;
        if !refresh {
            if let Some((cached, post)) = last.as_ref() {
                if cached == reference {
                    return Ok(post.clone());
                }
            }
        }

        let uri = self.post_uri(reference).await?;
        let post = self.client.get_post(&uri).await?;
        *last = Some((reference.to_string(), post.clone()));
        Ok(post)
    }

    async fn post_uri(&self, reference: &str) -> Result<AtUri, ResolveError> {
        let reference = reference.trim();
        if reference.starts_with("at://") {
            return Ok(reference.parse::<AtUri>()?);
        }
        let url: PostUrl = reference.parse()?;
        Ok(self.client.resolve_post_url(&url).await?)
    }
}

#[async_trait]
impl ContentResolver for XrpcContentResolver {
    async fn fetch_text(&self, reference: &str) -> Result<String, ResolveError> {
        let post = self.post(reference, true).await?;
        Ok(post.text().to_string())
    }

    async fn fetch_embedded_images(&self, reference: &str) -> Result<Vec<Vec<u8>>, ResolveError> {
        let post = self.post(reference, false).await?;

        let mut images = Vec::new();
        for url in post.image_urls() {
            match self.client.fetch_bytes(&url).await {
                Ok(bytes) => images.push(bytes),
                Err(e) => {
                    tracing::warn!(%url, status = e.status(), "skipping image that failed to download");
                }
            }
        }
        Ok(images)
    }

    async fn fetch_author(&self, reference: &str) -> Result<Did, ResolveError> {
        let post = self.post(reference, false).await?;
        Ok(post.uri.parse::<AtUri>()?.did)
    }
}

/// Label store backed by `tools.ozone.moderation.emitEvent`
pub struct OzoneLabelStore {
    client: Arc<RwLock<XrpcClient>>,
    labeler: Did,
    moderator: Did,
}

impl OzoneLabelStore {
    /// Wrap a client that already holds a moderator session
    pub fn new(client: XrpcClient, labeler: Did, moderator: Did) -> Self {
        Self {
            client: Arc::new(RwLock::new(client)),
            labeler,
            moderator,
        }
    }

    /// Log in as a moderator of `labeler`
    pub async fn login(
        mut client: XrpcClient,
        identifier: &str,
        password: &str,
        labeler: Did,
    ) -> Result<Self, SubmissionError> {
        let moderator = client.login(identifier, password).await?;
        Ok(Self::new(client, labeler, moderator))
    }

    /// DID of the labeler the events are emitted for
    pub fn labeler(&self) -> &Did {
        &self.labeler
    }

    /// DID recorded as the author of each event
    pub fn moderator(&self) -> &Did {
        &self.moderator
    }

    fn event_for(&self, request: &LabelMutationRequest) -> Result<EmitEventInput, SubmissionError> {
        let subject = Did::new(request.subject())?;
        Ok(EmitEventInput {
            event: ModEventLabel::new(
                request.create_labels().iter().cloned().collect(),
                request.negate_labels().iter().cloned().collect(),
            ),
            subject: RepoRef::new(&subject),
            subject_blob_cids: Vec::new(),
            created_by: self.moderator.to_string(),
        })
    }
}

#[async_trait]
impl LabelStoreClient for OzoneLabelStore {
    async fn submit(&self, request: &LabelMutationRequest) -> Result<(), SubmissionError> {
        let input = self.event_for(request)?;
        let client = self.client.read().await;
        client.emit_label_event(&self.labeler, &input).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelUniverse;
    use crate::mutation::{LabelAction, LabelMutationController};
    use crate::tiers::ProfileSignals;
    use atproto_client::XrpcClientConfig;

    fn store() -> OzoneLabelStore {
        let client = XrpcClient::new(XrpcClientConfig::new("http://127.0.0.1:9")).unwrap();
        OzoneLabelStore::new(
            client,
            Did::new("did:plc:labeler").unwrap(),
            Did::new("did:plc:moderator").unwrap(),
        )
    }

    #[test]
    fn test_event_from_request() {
        let controller = LabelMutationController::new(LabelUniverse::standard());
        let request =
            controller.add_request(LabelAction::Add, "did:plc:subject", &ProfileSignals::with_count(3));

        let input = store().event_for(&request).unwrap();
        assert_eq!(input.subject.did, "did:plc:subject");
        assert_eq!(input.created_by, "did:plc:moderator");
        assert_eq!(
            input.event.create_label_vals,
            vec!["publications-one-nine".to_string(), "verified-scientist".to_string()]
        );
        assert!(input.event.negate_label_vals.is_empty());
    }

    #[test]
    fn test_event_rejects_non_did_subject() {
        let controller = LabelMutationController::new(LabelUniverse::standard());
        let request = controller.delete_request(LabelAction::Delete, "alice.bsky.social");

        let err = store().event_for(&request).unwrap_err();
        assert!(matches!(err, SubmissionError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_submit_without_session_is_unauthorized() {
        let controller = LabelMutationController::new(LabelUniverse::standard());
        let request = controller.delete_request(LabelAction::Delete, "did:plc:subject");

        let err = store().submit(&request).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_invalid_reference() {
        let client = XrpcClient::new(XrpcClientConfig::new("http://127.0.0.1:9")).unwrap();
        let resolver = XrpcContentResolver::new(client);
        let err = resolver.fetch_text("https://example.com/not-a-post").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidReference(_)));
    }
}
