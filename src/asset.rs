//! Asset classes and produced artifacts.

use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::SystemTime;

/// Class of source asset handled by the pipeline.
///
/// Each class binds to exactly one transform chain and output rule in the
/// [`TransformRegistry`](crate::transform::TransformRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    /// Shared markup fragment included by pages and the entry
    MarkupFragment,
    /// Independently built markup page
    MarkupPage,
    /// The site entry page (builds to the output root)
    MarkupEntry,
    /// Stylesheet sources concatenated into one artifact
    Stylesheet,
    /// Script sources bundled into one artifact
    ScriptBundle,
    /// Raster images (re-encoded into sibling formats)
    RasterImage,
    /// SVG sources assembled into a single sprite document
    VectorSprite,
    /// Site favicon, copied path-preserved
    Favicon,
    /// Font files, converted and flattened
    Font,
}

impl AssetClass {
    /// All classes that have their own leaf pipeline task.
    ///
    /// `MarkupFragment` is absent: fragments are never built on their own,
    /// they are inputs to page and entry builds.
    pub fn pipeline_classes() -> [AssetClass; 8] {
        [
            AssetClass::MarkupEntry,
            AssetClass::MarkupPage,
            AssetClass::Stylesheet,
            AssetClass::ScriptBundle,
            AssetClass::RasterImage,
            AssetClass::VectorSprite,
            AssetClass::Favicon,
            AssetClass::Font,
        ]
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::MarkupFragment => write!(f, "fragment"),
            AssetClass::MarkupPage => write!(f, "page"),
            AssetClass::MarkupEntry => write!(f, "entry"),
            AssetClass::Stylesheet => write!(f, "styles"),
            AssetClass::ScriptBundle => write!(f, "scripts"),
            AssetClass::RasterImage => write!(f, "images"),
            AssetClass::VectorSprite => write!(f, "sprite"),
            AssetClass::Favicon => write!(f, "favicon"),
            AssetClass::Font => write!(f, "fonts"),
        }
    }
}

/// A produced output file.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Destination path the content was written to
    pub dest: PathBuf,
    /// Hex SHA-256 digest of the written bytes
    pub digest: String,
    /// Timestamp of the successful write
    pub written_at: SystemTime,
}

impl Artifact {
    /// Create an artifact record for content just written to `dest`.
    pub fn written(dest: PathBuf, content: &[u8]) -> Self {
        Self { dest, digest: content_digest(content), written_at: SystemTime::now() }
    }

    /// Whether this artifact is a stylesheet output.
    ///
    /// The dev loop uses this to pick style injection over a full reload.
    pub fn is_style(&self) -> bool {
        matches!(self.dest.extension().and_then(|e| e.to_str()), Some("css"))
    }
}

/// Hex SHA-256 digest of a byte slice.
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
