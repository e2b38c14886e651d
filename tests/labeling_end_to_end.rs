//! End-to-end labeling: input directory on disk, AppView and Ozone mocked

use atproto_client::{Did, XrpcClient, XrpcClientConfig};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use moderation::{CheckOutcome, OzoneLabelStore, ProfileSignals, StepStatus, XrpcContentResolver};
use sci_labeler::{LabelEvent, Labeler, LabelerConfig};
use std::io::Cursor;
use std::path::Path;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gradient_png(rising: bool) -> Vec<u8> {
    let image = DynamicImage::ImageLuma8(GrayImage::from_fn(9, 8, |x, _| {
        let x = if rising { x } else { 8 - x };
        Luma([(x * 28) as u8])
    }));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn write_inputs(dir: &Path) {
    std::fs::write(dir.join("t-and-s-words.csv"), "Word\nbanned keyword\n").unwrap();
    std::fs::write(dir.join("t-and-s-domains.csv"), "Domain\nscam.example\n").unwrap();
    std::fs::write(
        dir.join("news-domains.csv"),
        "Domain,Source\nnytimes.com,nyt\nbbc.co.uk,bbc\n",
    )
    .unwrap();

    let images = dir.join("dog-list-images");
    std::fs::create_dir(&images).unwrap();
    std::fs::write(images.join("reference.png"), gradient_png(true)).unwrap();
    std::fs::write(images.join("notes.txt"), "not an image").unwrap();
}

async fn mount_post(server: &MockServer, rkey: &str, text: &str, image_paths: &[&str]) {
    let uri = format!("at://did:plc:author/app.bsky.feed.post/{rkey}");
    let images: Vec<_> = image_paths
        .iter()
        .map(|p| serde_json::json!({"fullsize": format!("{}{}", server.uri(), p)}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getPosts"))
        .and(query_param("uris", uri.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "posts": [{
                "uri": uri,
                "record": {"text": text},
                "embed": {"$type": "app.bsky.embed.images#view", "images": images}
            }]
        })))
        .mount(server)
        .await;
}

struct Fixture {
    _inputs: tempfile::TempDir,
    server: MockServer,
    config: LabelerConfig,
    labeler: Labeler,
}

impl Fixture {
    async fn new() -> Self {
        let inputs = tempfile::tempdir().unwrap();
        write_inputs(inputs.path());

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xrpc/com.atproto.identity.resolveHandle"))
            .and(query_param("handle", "author.example"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"did": "did:plc:author"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/reference.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gradient_png(true)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/other.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gradient_png(false)))
            .mount(&server)
            .await;

        let config = LabelerConfig::new(inputs.path())
            .with_service_url(server.uri())
            .with_credentials("mod.example", "app-password", "did:plc:labeler");
        let labeler = Labeler::from_config(&config).unwrap();

        Self {
            _inputs: inputs,
            server,
            config,
            labeler,
        }
    }

    fn client(&self) -> XrpcClient {
        XrpcClient::new(XrpcClientConfig::new(&self.config.service_url)).unwrap()
    }

    fn post_link(rkey: &str) -> String {
        format!("https://bsky.app/profile/author.example/post/{rkey}")
    }
}

// =============================================================================
// Decisions
// =============================================================================

#[tokio::test]
async fn test_keyword_post_gets_trust_and_safety_once() {
    let fx = Fixture::new().await;
    mount_post(&fx.server, "p1", "This contains a Banned Keyword. banned keyword!", &[]).await;

    let resolver = XrpcContentResolver::new(fx.client());
    let report = fx.labeler.moderate_post(&resolver, &Fixture::post_link("p1")).await;
    assert_eq!(report.labels, vec!["t-and-s"]);
}

#[tokio::test]
async fn test_reference_image_gets_category_label() {
    let fx = Fixture::new().await;
    mount_post(&fx.server, "p2", "look at him", &["/img/other.png", "/img/reference.png"]).await;

    let resolver = XrpcContentResolver::new(fx.client());
    let report = fx.labeler.moderate_post(&resolver, &Fixture::post_link("p2")).await;
    assert_eq!(report.labels, vec!["dog"]);
    assert_eq!(report.category, CheckOutcome::Matched);
}

#[tokio::test]
async fn test_all_checks_in_order() {
    let fx = Fixture::new().await;
    mount_post(
        &fx.server,
        "p3",
        "via scam.example: story on nytimes.com and bbc.co.uk",
        &["/img/reference.png"],
    )
    .await;

    let resolver = XrpcContentResolver::new(fx.client());
    let report = fx.labeler.moderate_post(&resolver, &Fixture::post_link("p3")).await;
    assert_eq!(report.labels, vec!["t-and-s", "bbc", "nyt", "dog"]);
}

#[tokio::test]
async fn test_unremarkable_post_gets_nothing() {
    let fx = Fixture::new().await;
    mount_post(&fx.server, "p4", "coffee and a long proof", &["/img/other.png"]).await;

    let resolver = XrpcContentResolver::new(fx.client());
    let report = fx.labeler.moderate_post(&resolver, &Fixture::post_link("p4")).await;
    assert!(report.labels.is_empty());
    assert!(!report.is_degraded());
}

#[tokio::test]
async fn test_unknown_post_degrades_to_empty() {
    let fx = Fixture::new().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getPosts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"posts": []})))
        .mount(&fx.server)
        .await;

    let resolver = XrpcContentResolver::new(fx.client());
    let report = fx.labeler.moderate_post(&resolver, &Fixture::post_link("gone")).await;
    assert!(report.labels.is_empty());
    assert!(report.is_degraded());
}

// =============================================================================
// Label Events
// =============================================================================

#[tokio::test]
async fn test_update_event_against_ozone() {
    let fx = Fixture::new().await;

    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .and(body_partial_json(serde_json::json!({"identifier": "mod.example"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessJwt": "jwt",
            "refreshJwt": "refresh",
            "did": "did:plc:moderator",
            "handle": "mod.example"
        })))
        .mount(&fx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/tools.ozone.moderation.emitEvent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .expect(2)
        .mount(&fx.server)
        .await;

    let credentials = fx.config.require_credentials().unwrap();
    let store = OzoneLabelStore::login(
        fx.client(),
        &credentials.identifier,
        &credentials.password,
        Did::new(credentials.labeler_did.as_str()).unwrap(),
    )
    .await
    .unwrap();

    let event: LabelEvent = serde_json::from_str(
        r#"{"action": "update", "did": "did:plc:scientist",
            "labels": {"numPublications": 130, "firstPubYear": 2009, "lastPubYear": 2024}}"#,
    )
    .unwrap();
    let report = fx.labeler.handle_event(&store, &event).await.unwrap();

    assert!(report.is_success());
    assert!(report.steps.iter().all(|s| s.status == StepStatus::Submitted));
    assert!(report.steps[0].request.negate_labels().contains("nyt"));
    assert!(report.steps[0].request.negate_labels().contains("dog"));
    assert_eq!(
        report.steps[1].request.create_labels().iter().collect::<Vec<_>>(),
        vec![
            "publication-years-ten-nineteen",
            "publications-onehundred-twofifty",
            "verified-scientist"
        ]
    );
}

#[tokio::test]
async fn test_delete_event_needs_no_signals() {
    let fx = Fixture::new().await;
    let event: LabelEvent =
        serde_json::from_str(r#"{"action": "delete", "did": "did:plc:scientist"}"#).unwrap();
    assert_eq!(event.labels, ProfileSignals::default());

    let plan = fx
        .labeler
        .controller()
        .plan(event.action().unwrap(), &event.did, &event.labels);
    assert_eq!(plan.len(), 1);
    assert!(plan[0].is_negation());
}
