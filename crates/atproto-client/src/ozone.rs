//! Ozone moderation endpoints
//!
//! Session creation plus `tools.ozone.moderation.emitEvent` with a
//! `modEventLabel` payload, which is how a labeler account adds and negates
//! labels on a subject.

use serde::{Deserialize, Serialize};

use crate::types::Did;
use crate::xrpc::{XrpcClient, XrpcRequest};
use crate::{Error, Result};

/// Service id of a labeler inside its DID document
pub const LABELER_SERVICE_ID: &str = "atproto_labeler";

/// `$type` of a label moderation event
pub const MOD_EVENT_LABEL_TYPE: &str = "tools.ozone.moderation.defs#modEventLabel";

/// `$type` of an account subject
pub const REPO_REF_TYPE: &str = "com.atproto.admin.defs#repoRef";

/// Input of `com.atproto.server.createSession`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionInput {
    /// Handle or email
    pub identifier: String,
    /// Account or app password
    pub password: String,
}

/// Output of `com.atproto.server.createSession`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionOutput {
    /// Access JWT
    pub access_jwt: String,
    /// Refresh JWT
    pub refresh_jwt: String,
    /// Account DID
    pub did: String,
    /// Account handle
    pub handle: String,
}

/// Label event body: values to add and values to negate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModEventLabel {
    /// Always [`MOD_EVENT_LABEL_TYPE`]
    #[serde(rename = "$type")]
    pub kind: String,
    /// Label values to create
    pub create_label_vals: Vec<String>,
    /// Label values to negate
    pub negate_label_vals: Vec<String>,
}

impl ModEventLabel {
    /// Build a label event
    pub fn new(create: Vec<String>, negate: Vec<String>) -> Self {
        Self {
            kind: MOD_EVENT_LABEL_TYPE.to_string(),
            create_label_vals: create,
            negate_label_vals: negate,
        }
    }
}

/// Account subject of a moderation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Always [`REPO_REF_TYPE`]
    #[serde(rename = "$type")]
    pub kind: String,
    /// Account DID
    pub did: String,
}

impl RepoRef {
    /// Reference an account
    pub fn new(did: &Did) -> Self {
        Self {
            kind: REPO_REF_TYPE.to_string(),
            did: did.to_string(),
        }
    }
}

/// Input of `tools.ozone.moderation.emitEvent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitEventInput {
    /// The label event
    pub event: ModEventLabel,
    /// The labeled account
    pub subject: RepoRef,
    /// Blob CIDs the event applies to (none for account labels)
    pub subject_blob_cids: Vec<String>,
    /// DID of the moderator emitting the event
    pub created_by: String,
}

impl XrpcClient {
    /// Log in and attach the session's access token to this client
    ///
    /// Returns the DID of the authenticated account.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<Did> {
        let input = CreateSessionInput {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };
        let request = XrpcRequest::procedure("com.atproto.server.createSession").json_body(&input)?;

        let session = self
            .procedure::<CreateSessionOutput>(request)
            .await
            .map_err(|e| {
                if e.is_auth_error() {
                    Error::Auth(e.message().to_string())
                } else {
                    Error::Xrpc(e)
                }
            })?
            .data;

        self.set_access_token(session.access_jwt);
        tracing::info!(did = %session.did, handle = %session.handle, "session created");
        Did::new(session.did)
    }

    /// Emit a label event through the labeler's service proxy
    pub async fn emit_label_event(&self, labeler: &Did, input: &EmitEventInput) -> Result<()> {
        if !self.is_authenticated() {
            return Err(Error::Auth("emitEvent requires a session".to_string()));
        }

        let request = XrpcRequest::procedure("tools.ozone.moderation.emitEvent")
            .proxy(labeler.as_str(), LABELER_SERVICE_ID)
            .json_body(input)?;

        self.procedure::<serde_json::Value>(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_event_wire_shape() {
        let subject = Did::new("did:plc:subject").unwrap();
        let input = EmitEventInput {
            event: ModEventLabel::new(vec!["verified-scientist".to_string()], Vec::new()),
            subject: RepoRef::new(&subject),
            subject_blob_cids: Vec::new(),
            created_by: "did:plc:moderator".to_string(),
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["event"]["$type"], MOD_EVENT_LABEL_TYPE);
        assert_eq!(json["event"]["createLabelVals"][0], "verified-scientist");
        assert_eq!(json["event"]["negateLabelVals"], serde_json::json!([]));
        assert_eq!(json["subject"]["$type"], REPO_REF_TYPE);
        assert_eq!(json["subject"]["did"], "did:plc:subject");
        assert_eq!(json["subjectBlobCids"], serde_json::json!([]));
        assert_eq!(json["createdBy"], "did:plc:moderator");
    }

    #[tokio::test]
    async fn test_emit_requires_session() {
        let client = XrpcClient::new(crate::XrpcClientConfig::new("http://127.0.0.1:9")).unwrap();
        let labeler = Did::new("did:plc:labeler").unwrap();
        let input = EmitEventInput {
            event: ModEventLabel::new(Vec::new(), Vec::new()),
            subject: RepoRef::new(&labeler),
            subject_blob_cids: Vec::new(),
            created_by: labeler.to_string(),
        };

        let err = client.emit_label_event(&labeler, &input).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
