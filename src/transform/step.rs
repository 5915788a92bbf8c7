//! Transform steps and the payload shapes flowing between them.
//!
//! Every step declares an accepted input shape and a produced output
//! shape; chains are validated against these at construction time. The
//! heavy content transforms (style compilation, script bundling, image
//! re-encoding, font conversion) are collaborator boundaries: they honor
//! the declared shape contract with deterministic behavior, and the
//! orchestrator never depends on anything beyond that contract.

use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Shape of the data a step accepts or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Exactly one file
    SingleFile,
    /// A collection of files
    FileSet,
    /// A stream of named records
    RecordStream,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::SingleFile => write!(f, "single file"),
            Shape::FileSet => write!(f, "file set"),
            Shape::RecordStream => write!(f, "record stream"),
        }
    }
}

/// A source file in flight through a chain.
///
/// `rel` is the path relative to the selector root, preserved so output
/// rules can mirror or flatten it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the selector root
    pub rel: PathBuf,
    /// File content
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Create a source file from a relative path and content.
    pub fn new(rel: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { rel: rel.into(), bytes: bytes.into() }
    }
}

/// A named record produced by a parsing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Record name (e.g., the sprite symbol id)
    pub name: String,
    /// Record content
    pub bytes: Vec<u8>,
}

/// Data flowing between steps.
#[derive(Debug, Clone)]
pub enum Payload {
    /// One file
    Single(SourceFile),
    /// A collection of files
    Set(Vec<SourceFile>),
    /// A stream of named records
    Records(Vec<Record>),
}

impl Payload {
    /// The shape of this payload.
    pub fn shape(&self) -> Shape {
        match self {
            Payload::Single(_) => Shape::SingleFile,
            Payload::Set(_) => Shape::FileSet,
            Payload::Records(_) => Shape::RecordStream,
        }
    }

    /// Number of files or records carried.
    pub fn len(&self) -> usize {
        match self {
            Payload::Single(_) => 1,
            Payload::Set(files) => files.len(),
            Payload::Records(records) => records.len(),
        }
    }

    /// Whether the payload carries nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Error raised by a step. Classified fatal or recoverable at the task
/// boundary, not here.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// A source file failed its transform
    #[error("{step}: malformed source {source}: {detail}", source = .source_path.display())]
    MalformedSource {
        /// Step that rejected the source
        step: &'static str,
        /// Offending source identity
        source_path: PathBuf,
        /// What went wrong
        detail: String,
    },
    /// An include directive referenced a missing fragment
    #[error("include: unresolved fragment '{include}' referenced from {source}", source = .source_path.display())]
    UnresolvedInclude {
        /// Source containing the directive
        source_path: PathBuf,
        /// Fragment name that could not be read
        include: String,
    },
}

/// Maximum include nesting before expansion gives up.
///
/// Fragments may include other fragments (the entry head pulls in the
/// fonts preload fragment); the limit turns include cycles into a
/// malformed-source error instead of unbounded recursion.
const MAX_INCLUDE_DEPTH: usize = 8;

fn include_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<!--=include\s+(\S+)\s*-->").expect("static regex compiles"))
}

/// One step of a transform chain.
#[derive(Debug, Clone)]
pub enum TransformStep {
    /// Resolve `<!--=include name.html -->` directives against the
    /// fragments directory. FileSet -> FileSet.
    ExpandIncludes {
        /// Directory fragments are read from
        fragments_dir: PathBuf,
    },
    /// Compile stylesheet sources to css. Boundary step. FileSet -> FileSet.
    CompileStyles,
    /// Vendor-prefix adaptation. Boundary step. FileSet -> FileSet.
    VendorAdapt,
    /// Strip blank lines and surrounding whitespace. FileSet -> FileSet.
    Minify,
    /// Concatenate the set in path order into one named file.
    /// FileSet -> SingleFile.
    Concat {
        /// Name of the produced file
        name: String,
    },
    /// Bundle script sources. Boundary step. FileSet -> FileSet.
    BundleScripts,
    /// Emit each raster source plus sibling formats (one-to-many).
    /// Boundary step. FileSet -> FileSet.
    ReencodeImages {
        /// Extra formats emitted per raster source (e.g., webp, avif)
        formats: Vec<String>,
    },
    /// Convert font containers into web formats (one-to-many).
    /// Boundary step. FileSet -> FileSet.
    ConvertFonts {
        /// Formats emitted per convertible source (e.g., woff, woff2)
        formats: Vec<String>,
    },
    /// Parse svg sources into symbol records. FileSet -> RecordStream.
    ParseSymbols,
    /// Assemble symbol records into one sprite document.
    /// RecordStream -> SingleFile.
    AssembleSprite {
        /// Name of the produced sprite file
        name: String,
    },
    /// Pass content through unchanged. FileSet -> FileSet.
    PassThrough,
}

impl TransformStep {
    /// Step name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::ExpandIncludes { .. } => "include",
            TransformStep::CompileStyles => "compile-styles",
            TransformStep::VendorAdapt => "vendor-adapt",
            TransformStep::Minify => "minify",
            TransformStep::Concat { .. } => "concat",
            TransformStep::BundleScripts => "bundle-scripts",
            TransformStep::ReencodeImages { .. } => "reencode-images",
            TransformStep::ConvertFonts { .. } => "convert-fonts",
            TransformStep::ParseSymbols => "parse-symbols",
            TransformStep::AssembleSprite { .. } => "assemble-sprite",
            TransformStep::PassThrough => "pass-through",
        }
    }

    /// Shape this step accepts.
    pub fn input_shape(&self) -> Shape {
        match self {
            TransformStep::AssembleSprite { .. } => Shape::RecordStream,
            _ => Shape::FileSet,
        }
    }

    /// Shape this step produces.
    pub fn output_shape(&self) -> Shape {
        match self {
            TransformStep::Concat { .. } | TransformStep::AssembleSprite { .. } => {
                Shape::SingleFile
            }
            TransformStep::ParseSymbols => Shape::RecordStream,
            _ => Shape::FileSet,
        }
    }

    /// Apply the step to a payload of the declared input shape.
    ///
    /// Callers guarantee the shape matches; chains are validated at
    /// construction so a mismatch here is a programming error.
    pub fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        debug_assert_eq!(payload.shape(), self.input_shape());
        match self {
            TransformStep::ExpandIncludes { fragments_dir } => {
                let files = expect_set(payload);
                let mut out = Vec::with_capacity(files.len());
                for file in files {
                    out.push(expand_includes(file, fragments_dir)?);
                }
                Ok(Payload::Set(out))
            }
            TransformStep::CompileStyles => {
                let files = expect_set(payload);
                let mut out = Vec::with_capacity(files.len());
                for file in files {
                    let text = require_utf8("compile-styles", &file)?;
                    let rel = file.rel.with_extension("css");
                    out.push(SourceFile::new(rel, text.into_bytes()));
                }
                Ok(Payload::Set(out))
            }
            TransformStep::VendorAdapt => {
                // Boundary step: prefixing engines live outside the
                // orchestrator. Content passes through unchanged.
                Ok(payload)
            }
            TransformStep::Minify => {
                let files = expect_set(payload);
                let mut out = Vec::with_capacity(files.len());
                for file in files {
                    let text = require_utf8("minify", &file)?;
                    let minified: Vec<&str> =
                        text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
                    out.push(SourceFile::new(file.rel, minified.join("\n").into_bytes()));
                }
                Ok(Payload::Set(out))
            }
            TransformStep::Concat { name } => {
                let mut files = expect_set(payload);
                files.sort_by(|a, b| a.rel.cmp(&b.rel));
                let mut bytes = Vec::new();
                for (i, file) in files.iter().enumerate() {
                    if i > 0 {
                        bytes.push(b'\n');
                    }
                    bytes.extend_from_slice(&file.bytes);
                }
                Ok(Payload::Single(SourceFile::new(PathBuf::from(name), bytes)))
            }
            TransformStep::BundleScripts => {
                let files = expect_set(payload);
                for file in &files {
                    require_utf8("bundle-scripts", file)?;
                }
                Ok(Payload::Set(files))
            }
            TransformStep::ReencodeImages { formats } => {
                // Re-encoding is per-file independent, fan out across cores
                let files = expect_set(payload);
                let out: Vec<SourceFile> = files
                    .into_par_iter()
                    .flat_map_iter(|file| {
                        let mut emitted = Vec::with_capacity(formats.len() + 1);
                        if is_raster(&file.rel) {
                            for format in formats {
                                emitted.push(SourceFile::new(
                                    file.rel.with_extension(format),
                                    file.bytes.clone(),
                                ));
                            }
                        }
                        emitted.push(file);
                        emitted
                    })
                    .collect();
                Ok(Payload::Set(out))
            }
            TransformStep::ConvertFonts { formats } => {
                let files = expect_set(payload);
                let mut out = Vec::new();
                for file in files {
                    if is_font_container(&file.rel) {
                        for format in formats {
                            out.push(SourceFile::new(
                                file.rel.with_extension(format),
                                file.bytes.clone(),
                            ));
                        }
                    } else {
                        // Already a web format, pass through
                        out.push(file);
                    }
                }
                Ok(Payload::Set(out))
            }
            TransformStep::ParseSymbols => {
                let files = expect_set(payload);
                let mut records = Vec::with_capacity(files.len());
                for file in files {
                    let text = require_utf8("parse-symbols", &file)?;
                    let name = file
                        .rel
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    records.push(Record { name, bytes: svg_inner(&text).into_bytes() });
                }
                Ok(Payload::Records(records))
            }
            TransformStep::AssembleSprite { name } => {
                let mut records = match payload {
                    Payload::Records(records) => records,
                    _ => unreachable!("chain validated at construction"),
                };
                records.sort_by(|a, b| a.name.cmp(&b.name));
                let mut doc = String::from("<svg xmlns=\"http://www.w3.org/2000/svg\">\n");
                for record in &records {
                    doc.push_str(&format!(
                        "<symbol id=\"{}\">{}</symbol>\n",
                        record.name,
                        String::from_utf8_lossy(&record.bytes)
                    ));
                }
                doc.push_str("</svg>\n");
                Ok(Payload::Single(SourceFile::new(PathBuf::from(name), doc.into_bytes())))
            }
            TransformStep::PassThrough => Ok(payload),
        }
    }
}

fn expect_set(payload: Payload) -> Vec<SourceFile> {
    match payload {
        Payload::Set(files) => files,
        Payload::Single(file) => vec![file],
        Payload::Records(_) => unreachable!("chain validated at construction"),
    }
}

fn require_utf8(step: &'static str, file: &SourceFile) -> Result<String, TransformError> {
    String::from_utf8(file.bytes.clone()).map_err(|_| TransformError::MalformedSource {
        step,
        source_path: file.rel.clone(),
        detail: "content is not valid UTF-8".to_string(),
    })
}

fn is_raster(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("jpg") | Some("jpeg") | Some("png") | Some("gif")
    )
}

fn is_font_container(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("ttf") | Some("otf") | Some("eot")
    )
}

/// Strip the outer `<svg ...>` element, keeping its content.
fn svg_inner(text: &str) -> String {
    let trimmed = text.trim();
    let open_end = match trimmed.find('>') {
        Some(idx) if trimmed.starts_with("<svg") => idx + 1,
        _ => return trimmed.to_string(),
    };
    let close_start = trimmed.rfind("</svg>").unwrap_or(trimmed.len());
    trimmed[open_end..close_start].trim().to_string()
}

/// Recursively expand include directives in one file.
fn expand_includes(
    file: SourceFile,
    fragments_dir: &Path,
) -> Result<SourceFile, TransformError> {
    let text = require_utf8("include", &file)?;
    let expanded = expand_text(&text, &file.rel, fragments_dir, 0)?;
    Ok(SourceFile::new(file.rel, expanded.into_bytes()))
}

fn expand_text(
    text: &str,
    source_path: &Path,
    fragments_dir: &Path,
    depth: usize,
) -> Result<String, TransformError> {
    if depth >= MAX_INCLUDE_DEPTH {
        return Err(TransformError::MalformedSource {
            step: "include",
            source_path: source_path.to_path_buf(),
            detail: format!("include depth exceeds {}", MAX_INCLUDE_DEPTH),
        });
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in include_directive().captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = caps.get(1).expect("directive has one group").as_str();

        let fragment_path = fragments_dir.join(name);
        let fragment =
            std::fs::read_to_string(&fragment_path).map_err(|_| {
                TransformError::UnresolvedInclude {
                    source_path: source_path.to_path_buf(),
                    include: name.to_string(),
                }
            })?;
        let nested = expand_text(&fragment, &fragment_path, fragments_dir, depth + 1)?;

        out.push_str(&text[last..whole.start()]);
        out.push_str(&nested);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(files: Vec<SourceFile>) -> Payload {
        Payload::Set(files)
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::SingleFile.to_string(), "single file");
        assert_eq!(Shape::FileSet.to_string(), "file set");
        assert_eq!(Shape::RecordStream.to_string(), "record stream");
    }

    #[test]
    fn test_step_shapes() {
        let concat = TransformStep::Concat { name: "main.min.css".to_string() };
        assert_eq!(concat.input_shape(), Shape::FileSet);
        assert_eq!(concat.output_shape(), Shape::SingleFile);

        assert_eq!(TransformStep::ParseSymbols.output_shape(), Shape::RecordStream);
        let assemble = TransformStep::AssembleSprite { name: "sprite.view.svg".to_string() };
        assert_eq!(assemble.input_shape(), Shape::RecordStream);
        assert_eq!(assemble.output_shape(), Shape::SingleFile);
    }

    #[test]
    fn test_concat_orders_by_path() {
        let step = TransformStep::Concat { name: "out.css".to_string() };
        let payload = set(vec![
            SourceFile::new("b.css", "b"),
            SourceFile::new("a.css", "a"),
        ]);
        let out = step.apply(payload).unwrap();
        match out {
            Payload::Single(file) => {
                assert_eq!(file.rel, PathBuf::from("out.css"));
                assert_eq!(file.bytes, b"a\nb");
            }
            other => panic!("expected single file, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_minify_strips_blank_lines() {
        let step = TransformStep::Minify;
        let payload = set(vec![SourceFile::new("a.css", "  body {\n\n  color: red;\n}\n")]);
        let out = step.apply(payload).unwrap();
        match out {
            Payload::Set(files) => assert_eq!(files[0].bytes, b"body {\ncolor: red;\n}"),
            other => panic!("expected set, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_minify_rejects_invalid_utf8() {
        let step = TransformStep::Minify;
        let payload = set(vec![SourceFile::new("bad.css", vec![0xff, 0xfe, 0x00])]);
        let err = step.apply(payload).unwrap_err();
        assert!(matches!(err, TransformError::MalformedSource { step: "minify", .. }));
    }

    #[test]
    fn test_compile_styles_renames_extension() {
        let step = TransformStep::CompileStyles;
        let payload = set(vec![SourceFile::new("main.scss", "body {}")]);
        let out = step.apply(payload).unwrap();
        match out {
            Payload::Set(files) => assert_eq!(files[0].rel, PathBuf::from("main.css")),
            other => panic!("expected set, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_reencode_images_one_to_many() {
        let step =
            TransformStep::ReencodeImages { formats: vec!["webp".to_string(), "avif".to_string()] };
        let payload = set(vec![
            SourceFile::new("photo.jpg", "jpgdata"),
            SourceFile::new("notes.txt", "text"),
        ]);
        let out = step.apply(payload).unwrap();
        match out {
            Payload::Set(files) => {
                let rels: Vec<_> = files.iter().map(|f| f.rel.clone()).collect();
                assert!(rels.contains(&PathBuf::from("photo.jpg")));
                assert!(rels.contains(&PathBuf::from("photo.webp")));
                assert!(rels.contains(&PathBuf::from("photo.avif")));
                // Non-raster passes through without siblings
                assert!(rels.contains(&PathBuf::from("notes.txt")));
                assert_eq!(files.len(), 4);
            }
            other => panic!("expected set, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_convert_fonts_replaces_container() {
        let step =
            TransformStep::ConvertFonts { formats: vec!["woff".to_string(), "woff2".to_string()] };
        let payload = set(vec![
            SourceFile::new("Montserrat-Regular.ttf", "ttf"),
            SourceFile::new("Already.woff2", "woff2"),
        ]);
        let out = step.apply(payload).unwrap();
        match out {
            Payload::Set(files) => {
                let rels: Vec<_> = files.iter().map(|f| f.rel.clone()).collect();
                assert!(rels.contains(&PathBuf::from("Montserrat-Regular.woff")));
                assert!(rels.contains(&PathBuf::from("Montserrat-Regular.woff2")));
                assert!(!rels.contains(&PathBuf::from("Montserrat-Regular.ttf")));
                assert!(rels.contains(&PathBuf::from("Already.woff2")));
            }
            other => panic!("expected set, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_parse_and_assemble_sprite() {
        let parse = TransformStep::ParseSymbols;
        let assemble = TransformStep::AssembleSprite { name: "sprite.view.svg".to_string() };
        let payload = set(vec![
            SourceFile::new("icons/star.svg", "<svg viewBox=\"0 0 16 16\"><path d=\"M0\"/></svg>"),
            SourceFile::new("icons/arrow.svg", "<svg><path d=\"M1\"/></svg>"),
        ]);

        let records = parse.apply(payload).unwrap();
        assert_eq!(records.shape(), Shape::RecordStream);

        let out = assemble.apply(records).unwrap();
        match out {
            Payload::Single(file) => {
                let text = String::from_utf8(file.bytes).unwrap();
                assert!(text.contains("<symbol id=\"arrow\">"));
                assert!(text.contains("<symbol id=\"star\">"));
                // Sorted by name: arrow before star
                assert!(text.find("arrow").unwrap() < text.find("star").unwrap());
                assert!(!text.contains("viewBox"), "outer svg element should be stripped");
            }
            other => panic!("expected single file, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_expand_includes() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("header.html"), "<header>H</header>").unwrap();

        let step = TransformStep::ExpandIncludes { fragments_dir: temp.path().to_path_buf() };
        let payload = set(vec![SourceFile::new(
            "index.html",
            "<!--=include header.html -->\n<main></main>",
        )]);
        let out = step.apply(payload).unwrap();
        match out {
            Payload::Set(files) => {
                let text = String::from_utf8(files[0].bytes.clone()).unwrap();
                assert_eq!(text, "<header>H</header>\n<main></main>");
            }
            other => panic!("expected set, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_expand_includes_nested() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("head.html"), "<head><!--=include fonts.html --></head>")
            .unwrap();
        std::fs::write(temp.path().join("fonts.html"), "<link rel=\"preload\">").unwrap();

        let step = TransformStep::ExpandIncludes { fragments_dir: temp.path().to_path_buf() };
        let payload = set(vec![SourceFile::new("index.html", "<!--=include head.html -->")]);
        let out = step.apply(payload).unwrap();
        match out {
            Payload::Set(files) => {
                let text = String::from_utf8(files[0].bytes.clone()).unwrap();
                assert_eq!(text, "<head><link rel=\"preload\"></head>");
            }
            other => panic!("expected set, got {:?}", other.shape()),
        }
    }

    #[test]
    fn test_expand_includes_unresolved() {
        let temp = TempDir::new().unwrap();
        let step = TransformStep::ExpandIncludes { fragments_dir: temp.path().to_path_buf() };
        let payload = set(vec![SourceFile::new("index.html", "<!--=include missing.html -->")]);
        let err = step.apply(payload).unwrap_err();
        match err {
            TransformError::UnresolvedInclude { include, .. } => {
                assert_eq!(include, "missing.html");
            }
            other => panic!("expected unresolved include, got {}", other),
        }
    }

    #[test]
    fn test_expand_includes_cycle_detected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.html"), "<!--=include b.html -->").unwrap();
        std::fs::write(temp.path().join("b.html"), "<!--=include a.html -->").unwrap();

        let step = TransformStep::ExpandIncludes { fragments_dir: temp.path().to_path_buf() };
        let payload = set(vec![SourceFile::new("index.html", "<!--=include a.html -->")]);
        let err = step.apply(payload).unwrap_err();
        assert!(matches!(err, TransformError::MalformedSource { step: "include", .. }));
    }

    #[test]
    fn test_pass_through() {
        let step = TransformStep::PassThrough;
        let payload = set(vec![SourceFile::new("favicon.svg", vec![0x00, 0xff])]);
        let out = step.apply(payload).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(Payload::Set(vec![]).len(), 0);
        assert!(Payload::Set(vec![]).is_empty());
        assert_eq!(Payload::Single(SourceFile::new("a", "x")).len(), 1);
    }
}
