//! Media processing for the labeler
//!
//! This crate handles image decoding and perceptual hashing used to
//! recognise images similar to a reference set.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod phash;

pub use phash::{HashError, PerceptualHash, ReferenceHashIndex, MAX_DISTANCE_FRACTION};
