//! Project scaffolding.
//!
//! Creates the source directory skeleton and starter files a new site
//! needs. Existing files are never overwritten; they are reported as
//! skipped so re-running scaffold on a live project is safe.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error during project scaffolding
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Failed to create directory
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        /// The directory
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Failed to write file
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFile {
        /// The file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Invalid project name
    #[error("Invalid project name '{0}'. Use letters, numbers, hyphens, and underscores.")]
    InvalidName(String),
}

/// What scaffolding created and what it left alone.
#[derive(Debug, Default)]
pub struct ScaffoldReport {
    /// Files and directories created
    pub created: Vec<PathBuf>,
    /// Files that already existed and were left untouched
    pub skipped: Vec<PathBuf>,
}

fn validate_name(name: &str) -> Result<(), ScaffoldError> {
    if name.is_empty() {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err(ScaffoldError::InvalidName(name.to_string()));
        }
    }
    Ok(())
}

/// Source directories every new project starts with.
const SOURCE_DIRS: [&str; 7] = [
    "app/dev/html-pages",
    "app/dev/html-components",
    "app/dev/scss",
    "app/dev/js",
    "app/dev/img/sprite",
    "app/dev/img/favicon",
    "app/dev/fonts",
];

/// Create a new project skeleton under `root`.
pub fn scaffold_project(root: &Path, name: &str) -> Result<ScaffoldReport, ScaffoldError> {
    validate_name(name)?;
    let mut report = ScaffoldReport::default();

    for dir in SOURCE_DIRS {
        let path = root.join(dir);
        if !path.is_dir() {
            fs::create_dir_all(&path)
                .map_err(|source| ScaffoldError::CreateDir { path: path.clone(), source })?;
            report.created.push(path);
        }
    }

    let files: [(&str, String); 8] = [
        ("sitepipe.toml", config_template(name)),
        ("app/dev/html-pages/index.html", entry_template()),
        ("app/dev/html-components/head.html", head_template(name)),
        ("app/dev/html-components/header.html", header_template(name)),
        ("app/dev/html-components/main.html", main_template(name)),
        ("app/dev/html-components/footer.html", footer_template()),
        ("app/dev/html-components/fonts.html", fonts_template()),
        ("app/dev/scss/main.scss", styles_template()),
    ];

    for (rel, content) in files {
        write_new(root.join(rel), &content, &mut report)?;
    }
    write_new(root.join("app/dev/js/index.js"), scripts_template(), &mut report)?;

    // Empty concat outputs so the entry's links resolve before the first build
    for rel in ["app/main.min.css", "app/index.min.js"] {
        write_new(root.join(rel), "", &mut report)?;
    }

    Ok(report)
}

fn write_new(
    path: PathBuf,
    content: &str,
    report: &mut ScaffoldReport,
) -> Result<(), ScaffoldError> {
    if path.exists() {
        report.skipped.push(path);
        return Ok(());
    }
    fs::write(&path, content)
        .map_err(|source| ScaffoldError::WriteFile { path: path.clone(), source })?;
    report.created.push(path);
    Ok(())
}

fn config_template(name: &str) -> String {
    format!(
        r#"[project]
name = "{}"

[watch]
debounce_ms = 100
"#,
        name
    )
}

fn entry_template() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<!--=include head.html -->
<body>
<!--=include header.html -->
<!--=include main.html -->
<!--=include footer.html -->
  <script src="index.min.js"></script>
</body>
</html>
"#
    .to_string()
}

fn head_template(name: &str) -> String {
    format!(
        r#"<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{}</title>
<!--=include fonts.html -->
  <link rel="stylesheet" href="main.min.css">
</head>
"#,
        name
    )
}

fn main_template(name: &str) -> String {
    format!("<main>\n  <h1>{}</h1>\n</main>\n", name)
}

fn fonts_template() -> String {
    "<!-- font preloads, one per file in src/fonts/ -->\n".to_string()
}

fn header_template(name: &str) -> String {
    format!(
        r#"<header>
  <nav>
    <a href="index.html">{}</a>
  </nav>
</header>
"#,
        name
    )
}

fn footer_template() -> String {
    "<footer>\n  <p>Built with sitepipe</p>\n</footer>\n".to_string()
}

fn styles_template() -> String {
    r#"body {
  margin: 0;
  font-family: system-ui, sans-serif;
}
"#
    .to_string()
}

fn scripts_template() -> &'static str {
    "document.addEventListener('DOMContentLoaded', () => {\n});\n"
}
