//! Perceptual image hashing
//!
//! Images are reduced to a 64-bit difference hash: the image is converted to
//! grayscale, downscaled to 9×8 pixels, and each bit records whether a pixel
//! is brighter than its left neighbour. Visually similar images produce hashes
//! with a small Hamming distance, regardless of resolution or recompression.

use image::imageops::FilterType;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Width and height of the difference grid
const GRID: u32 = 8;

/// Largest fraction of differing bits still considered a match
///
/// Applied to the hash length, so a 64-bit hash matches at a Hamming distance
/// of at most 16.
pub const MAX_DISTANCE_FRACTION: f64 = 0.25;

/// File extensions accepted when loading reference images
const REFERENCE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Errors that can occur during hashing
#[derive(Debug, Error)]
pub enum HashError {
    /// Bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Reference directory missing or unreadable
    #[error("Cannot read reference directory {path}: {source}")]
    Directory {
        /// Directory that failed
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Malformed hex representation
    #[error("Invalid perceptual hash: {0}")]
    InvalidHex(String),
}

/// Result type for hashing operations
pub type Result<T> = std::result::Result<T, HashError>;

/// 64-bit difference hash of an image
///
/// Every hash has the same bit length, so any two hashes are comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    /// Number of bits in a hash
    pub const BITS: u32 = GRID * GRID;

    /// Wrap raw bits
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits, row-major with the top-left comparison in the highest bit
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Hash an encoded image (any format the `image` crate was built with)
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&image))
    }

    /// Hash a decoded image
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let small = image
            .grayscale()
            .resize_exact(GRID + 1, GRID, FilterType::Lanczos3)
            .to_luma8();

        let mut bits = 0u64;
        for y in 0..GRID {
            for x in 0..GRID {
                let left = small.get_pixel(x, y)[0];
                let right = small.get_pixel(x + 1, y)[0];
                bits = (bits << 1) | u64::from(right > left);
            }
        }
        Self(bits)
    }

    /// Hamming distance to another hash
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Largest distance accepted by [`PerceptualHash::is_similar`]
    pub fn max_similar_distance() -> u32 {
        (MAX_DISTANCE_FRACTION * f64::from(Self::BITS)).floor() as u32
    }

    /// Whether two hashes are within the similarity threshold
    pub fn is_similar(&self, other: &PerceptualHash) -> bool {
        self.distance(other) <= Self::max_similar_distance()
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PerceptualHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 16 {
            return Err(HashError::InvalidHex(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| HashError::InvalidHex(s.to_string()))
    }
}

/// Immutable set of reference hashes
#[derive(Debug, Clone, Default)]
pub struct ReferenceHashIndex {
    hashes: Vec<PerceptualHash>,
}

impl ReferenceHashIndex {
    /// Build an index from precomputed hashes
    pub fn from_hashes(hashes: impl IntoIterator<Item = PerceptualHash>) -> Self {
        Self {
            hashes: hashes.into_iter().collect(),
        }
    }

    /// Hash every `.jpg`, `.jpeg` and `.png` file in a directory
    ///
    /// Files are visited in file-name order. Files that fail to read or decode
    /// are logged and skipped; only a missing or unreadable directory is an
    /// error.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| HashError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| has_reference_extension(path))
            .collect();
        paths.sort();

        let mut hashes = Vec::with_capacity(paths.len());
        for path in paths {
            let hashed = std::fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    PerceptualHash::from_image_bytes(&bytes).map_err(|e| e.to_string())
                });
            match hashed {
                Ok(hash) => hashes.push(hash),
                Err(reason) => {
                    tracing::warn!(path = %path.display(), %reason, "skipping reference image");
                }
            }
        }

        tracing::info!(dir = %dir.display(), count = hashes.len(), "reference hashes loaded");
        Ok(Self { hashes })
    }

    /// Number of reference hashes
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether the index holds no hashes
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Reference hashes in load order
    pub fn hashes(&self) -> &[PerceptualHash] {
        &self.hashes
    }

    /// Smallest distance from `hash` to any reference, if the index is non-empty
    pub fn nearest_distance(&self, hash: &PerceptualHash) -> Option<u32> {
        self.hashes.iter().map(|r| r.distance(hash)).min()
    }

    /// Whether any reference is within the similarity threshold of `hash`
    pub fn contains_similar(&self, hash: &PerceptualHash) -> bool {
        self.hashes.iter().any(|r| r.is_similar(hash))
    }
}

fn has_reference_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            REFERENCE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}
