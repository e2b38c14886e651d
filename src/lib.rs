//! Bluesky labeler for verified scientists
//!
//! Decides labels for posts (trust-and-safety, news sources, a reference
//! image category) and maintains publication-tier labels on accounts through
//! an Ozone label store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod handler;
pub mod telemetry;

pub use config::{Credentials, LabelerConfig};
pub use handler::{LabelEvent, Labeler};
pub use telemetry::init_tracing;
