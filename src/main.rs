use anyhow::{bail, Context};
use atproto_client::{Did, XrpcClient, XrpcClientConfig};
use clap::{Parser, Subcommand};
use moderation::{label_definitions, OzoneLabelStore, StepStatus, XrpcContentResolver};
use sci_labeler::{init_tracing, LabelEvent, Labeler, LabelerConfig};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sci-labeler", version, about = "Bluesky labeler for verified scientists")]
struct Cli {
    /// Directory with rule listings and reference images
    #[arg(long, global = true, env = "LABELER_INPUT_DIR")]
    input_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the labels each post would receive
    Moderate {
        /// bsky.app post links or at:// URIs
        #[arg(required = true)]
        posts: Vec<String>,
    },
    /// Apply a label event to an account
    Apply {
        /// JSON event file; reads stdin when omitted
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Print the label definitions as JSON
    Definitions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = LabelerConfig::from_env()?;
    if let Some(dir) = cli.input_dir {
        config.input_dir = dir;
    }

    match cli.command {
        Commands::Moderate { posts } => moderate(&config, &posts).await,
        Commands::Apply { event } => apply(&config, event).await,
        Commands::Definitions => {
            println!("{}", serde_json::to_string_pretty(&label_definitions())?);
            Ok(())
        }
    }
}

fn xrpc_client(config: &LabelerConfig) -> anyhow::Result<XrpcClient> {
    let client_config = XrpcClientConfig::new(&config.service_url).with_timeout(config.timeout);
    Ok(XrpcClient::new(client_config)?)
}

async fn moderate(config: &LabelerConfig, posts: &[String]) -> anyhow::Result<()> {
    let labeler = Labeler::from_config(config)?;
    let resolver = XrpcContentResolver::new(xrpc_client(config)?);

    for post in posts {
        let report = labeler.moderate_post(&resolver, post).await;
        if report.is_degraded() {
            tracing::warn!(post = %post, ?report, "decision made with unavailable checks");
        }
        println!("{post}\t{}", serde_json::to_string(&report.labels)?);
    }
    Ok(())
}

async fn apply(config: &LabelerConfig, event_path: Option<PathBuf>) -> anyhow::Result<()> {
    let raw = match &event_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading event {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let event: LabelEvent = serde_json::from_str(&raw).context("parsing label event")?;
    let (action, subject) = event.validate()?;
    tracing::debug!(%action, %subject, "label event accepted");

    let credentials = config.require_credentials()?;
    let labeler = Labeler::from_config(config)?;
    let labeler_did = Did::new(credentials.labeler_did.as_str())?;
    let store = OzoneLabelStore::login(
        xrpc_client(config)?,
        &credentials.identifier,
        &credentials.password,
        labeler_did,
    )
    .await?;

    let report = labeler.handle_event(&store, &event).await?;
    for (i, step) in report.steps.iter().enumerate() {
        let status = match &step.status {
            StepStatus::Submitted => "submitted".to_string(),
            StepStatus::Failed(e) => format!("failed: {e}"),
            StepStatus::Skipped => "skipped".to_string(),
        };
        println!(
            "{} step {}: create={:?} negate={:?} {}",
            report.action,
            i + 1,
            step.request.create_labels(),
            step.request.negate_labels(),
            status
        );
    }

    if let Some(e) = report.first_error() {
        bail!("{} for {} did not complete: {e}", report.action, event.did);
    }
    Ok(())
}
