//! Per-asset-class pipeline registry: chain plus output rule.

use super::chain::{ChainError, TransformChain};
use super::step::{Payload, Shape, SourceFile, TransformStep};
use crate::asset::{Artifact, AssetClass};
use crate::layout::ProjectLayout;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Registry construction error. Configuration class: aborts startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A chain failed shape validation
    #[error("pipeline '{class}': {source}")]
    Chain {
        /// Asset class being registered
        class: AssetClass,
        /// Underlying chain error
        source: ChainError,
    },
    /// The chain's final shape does not fit the output rule
    #[error("pipeline '{class}': chain produces {produced} but rule '{rule}' needs {needed}")]
    RuleShape {
        /// Asset class being registered
        class: AssetClass,
        /// Shape the chain produces
        produced: Shape,
        /// Rule name
        rule: &'static str,
        /// Shape the rule consumes
        needed: Shape,
    },
}

/// Filesystem region a pipeline writes into. Used to verify parallel
/// siblings never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputClaim {
    /// Exactly one file
    File(PathBuf),
    /// A directory subtree
    Dir(PathBuf),
}

impl OutputClaim {
    /// Whether two claims can collide.
    ///
    /// A file claim conflicts with a directory claim that contains it;
    /// two directory claims conflict when either nests inside the other.
    pub fn overlaps(&self, other: &OutputClaim) -> bool {
        match (self, other) {
            (OutputClaim::File(a), OutputClaim::File(b)) => a == b,
            (OutputClaim::File(f), OutputClaim::Dir(d))
            | (OutputClaim::Dir(d), OutputClaim::File(f)) => f.starts_with(d),
            (OutputClaim::Dir(a), OutputClaim::Dir(b)) => {
                a.starts_with(b) || b.starts_with(a)
            }
        }
    }

    /// The claimed path.
    pub fn path(&self) -> &Path {
        match self {
            OutputClaim::File(p) | OutputClaim::Dir(p) => p,
        }
    }
}

impl std::fmt::Display for OutputClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputClaim::File(p) => write!(f, "file {}", p.display()),
            OutputClaim::Dir(p) => write!(f, "dir {}", p.display()),
        }
    }
}

/// Where a pipeline's final payload lands.
#[derive(Debug, Clone)]
pub enum OutputRule {
    /// Write the single produced file to exactly this path
    ConcatTo(PathBuf),
    /// Drop directory structure, write every file directly into the dir
    FlattenInto(PathBuf),
    /// Preserve relative paths under the dir
    MirrorInto(PathBuf),
}

impl OutputRule {
    /// Rule name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            OutputRule::ConcatTo(_) => "concat-to",
            OutputRule::FlattenInto(_) => "flatten-into",
            OutputRule::MirrorInto(_) => "mirror-into",
        }
    }

    /// Shape this rule consumes.
    pub fn input_shape(&self) -> Shape {
        match self {
            OutputRule::ConcatTo(_) => Shape::SingleFile,
            OutputRule::FlattenInto(_) | OutputRule::MirrorInto(_) => Shape::FileSet,
        }
    }

    /// The filesystem region this rule writes.
    pub fn claim(&self) -> OutputClaim {
        match self {
            OutputRule::ConcatTo(path) => OutputClaim::File(path.clone()),
            OutputRule::FlattenInto(dir) | OutputRule::MirrorInto(dir) => {
                OutputClaim::Dir(dir.clone())
            }
        }
    }

    /// Write the payload to disk, returning the artifacts produced.
    pub fn write(&self, payload: Payload) -> std::io::Result<Vec<Artifact>> {
        match self {
            OutputRule::ConcatTo(path) => {
                let file = match payload {
                    Payload::Single(file) => file,
                    _ => unreachable!("registry validated at construction"),
                };
                Ok(vec![write_artifact(path, &file.bytes)?])
            }
            OutputRule::FlattenInto(dir) => {
                let files = expect_set(payload);
                let mut artifacts = Vec::with_capacity(files.len());
                for file in files {
                    let name = file.rel.file_name().unwrap_or(file.rel.as_os_str());
                    artifacts.push(write_artifact(&dir.join(name), &file.bytes)?);
                }
                Ok(artifacts)
            }
            OutputRule::MirrorInto(dir) => {
                let files = expect_set(payload);
                let mut artifacts = Vec::with_capacity(files.len());
                for file in files {
                    artifacts.push(write_artifact(&dir.join(&file.rel), &file.bytes)?);
                }
                Ok(artifacts)
            }
        }
    }
}

fn expect_set(payload: Payload) -> Vec<SourceFile> {
    match payload {
        Payload::Set(files) => files,
        _ => unreachable!("registry validated at construction"),
    }
}

fn write_artifact(dest: &Path, bytes: &[u8]) -> std::io::Result<Artifact> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, bytes)?;
    Ok(Artifact::written(dest.to_path_buf(), bytes))
}

/// A registered pipeline: validated chain plus output rule.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// The shape-validated transform chain
    pub chain: TransformChain,
    /// Where the final payload lands
    pub rule: OutputRule,
}

/// Maps each asset class to its pipeline.
///
/// Built once at startup; registration re-checks that the chain's final
/// shape fits the output rule, so a registry that constructs can always
/// write what its chains produce.
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    entries: HashMap<AssetClass, Pipeline>,
}

impl TransformRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Register a pipeline for an asset class.
    pub fn register(
        &mut self,
        class: AssetClass,
        steps: Vec<TransformStep>,
        rule: OutputRule,
    ) -> Result<(), RegistryError> {
        let chain =
            TransformChain::new(steps).map_err(|source| RegistryError::Chain { class, source })?;
        if chain.output_shape() != rule.input_shape() {
            return Err(RegistryError::RuleShape {
                class,
                produced: chain.output_shape(),
                rule: rule.name(),
                needed: rule.input_shape(),
            });
        }
        self.entries.insert(class, Pipeline { chain, rule });
        Ok(())
    }

    /// Look up the pipeline for an asset class.
    pub fn pipeline(&self, class: AssetClass) -> Option<&Pipeline> {
        self.entries.get(&class)
    }

    /// The standard pipeline set for a resolved layout.
    pub fn standard(layout: &ProjectLayout) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        registry.register(
            AssetClass::MarkupEntry,
            vec![
                TransformStep::ExpandIncludes { fragments_dir: layout.fragments_dir.clone() },
                TransformStep::Concat { name: layout.entry_name.clone() },
            ],
            OutputRule::ConcatTo(layout.entry_file.clone()),
        )?;

        registry.register(
            AssetClass::MarkupPage,
            vec![TransformStep::ExpandIncludes { fragments_dir: layout.fragments_dir.clone() }],
            OutputRule::MirrorInto(layout.pages_out.clone()),
        )?;

        let css_name = layout
            .css_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main.min.css".to_string());
        registry.register(
            AssetClass::Stylesheet,
            vec![
                TransformStep::CompileStyles,
                TransformStep::VendorAdapt,
                TransformStep::Minify,
                TransformStep::Concat { name: css_name },
            ],
            OutputRule::ConcatTo(layout.css_file.clone()),
        )?;

        let js_name = layout
            .js_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index.min.js".to_string());
        registry.register(
            AssetClass::ScriptBundle,
            vec![
                TransformStep::BundleScripts,
                TransformStep::Minify,
                TransformStep::Concat { name: js_name },
            ],
            OutputRule::ConcatTo(layout.js_file.clone()),
        )?;

        registry.register(
            AssetClass::RasterImage,
            vec![TransformStep::ReencodeImages {
                formats: vec!["webp".to_string(), "avif".to_string()],
            }],
            OutputRule::MirrorInto(layout.images_out.clone()),
        )?;

        let sprite_name = layout
            .sprite_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sprite.view.svg".to_string());
        registry.register(
            AssetClass::VectorSprite,
            vec![
                TransformStep::ParseSymbols,
                TransformStep::AssembleSprite { name: sprite_name },
            ],
            OutputRule::ConcatTo(layout.sprite_file.clone()),
        )?;

        registry.register(
            AssetClass::Favicon,
            vec![TransformStep::PassThrough],
            OutputRule::MirrorInto(layout.favicon_out.clone()),
        )?;

        registry.register(
            AssetClass::Font,
            vec![TransformStep::ConvertFonts {
                formats: vec!["woff".to_string(), "woff2".to_string()],
            }],
            OutputRule::FlattenInto(layout.fonts_out.clone()),
        )?;

        Ok(registry)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}
