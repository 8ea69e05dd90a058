//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - `doc_project`: a temp directory holding `doc.tex`, `doc.pdf` and a plain
//!   `doc.synctex` in which line 10 of `doc.tex` sits on page 1 at
//!   left 100, bottom 200, height 20 (PDF big points)
//!
//! [`MappingWriter`] produces mapping file bodies from big-point coordinates,
//! and [`gzip`] compresses them for `.synctex.gz` tests.

use flate2::Compression;
use flate2::write::GzEncoder;
use rstest::fixture;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scaled points per PDF big point.
#[allow(dead_code)]
const UNIT: f64 = 65781.76;

/// A temporary directory for test isolation, removed when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `path` inside this workspace.
    pub fn join(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Creates a file with the given content; parent directories are created as needed.
    ///
    /// # Panics
    /// Panics if file creation fails.
    pub fn create_file(&self, path: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
        full_path
    }

    pub fn remove_file(&self, path: &str) {
        std::fs::remove_file(self.root.join(path))
            .unwrap_or_else(|e| panic!("Failed to remove file '{}': {}", path, e));
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
fn sp(bp: f64) -> i64 {
    (bp * UNIT).round() as i64
}

/// Writes mapping file bodies the way TeX lays them out.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct MappingWriter {
    lines: Vec<String>,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl MappingWriter {
    pub fn new() -> Self {
        Self {
            lines: vec![
                "SyncTeX Version:1".to_string(),
                "Output:pdf".to_string(),
                "Magnification:1000".to_string(),
                "Unit:1".to_string(),
            ],
        }
    }

    pub fn input(mut self, tag: u32, path: impl AsRef<str>) -> Self {
        self.lines.push(format!("Input:{}:{}", tag, path.as_ref()));
        self
    }

    pub fn offset(mut self, x: f64, y: f64) -> Self {
        self.lines.push(format!("X Offset:{}", sp(x)));
        self.lines.push(format!("Y Offset:{}", sp(y)));
        self
    }

    pub fn open_page(mut self, page: u32) -> Self {
        self.lines.push("Content:".to_string());
        self.lines.push(format!("{{{}", page));
        self
    }

    pub fn close_page(mut self, page: u32) -> Self {
        self.lines.push(format!("}}{}", page));
        self
    }

    /// Opens an hbox whose height the following elements take.
    pub fn open_hbox(mut self, tag: u32, line: u32, left: f64, bottom: f64, width: f64, height: f64) -> Self {
        self.lines.push(format!(
            "({},{}:{},{}:{},{},0",
            tag,
            line,
            sp(left),
            sp(bottom),
            sp(width),
            sp(height)
        ));
        self
    }

    pub fn close_hbox(mut self) -> Self {
        self.lines.push(")".to_string());
        self
    }

    /// Leaf element of record type `kind` (`x`, `g`, `k`, `$`, ...).
    pub fn element(mut self, kind: char, tag: u32, line: u32, left: f64, bottom: f64, width: Option<f64>) -> Self {
        let mut record = format!("{}{},{}:{},{}", kind, tag, line, sp(left), sp(bottom));
        if let Some(width) = width {
            record.push_str(&format!(":{}", sp(width)));
        }
        self.lines.push(record);
        self
    }

    pub fn build(mut self) -> String {
        self.lines.push("Postamble:".to_string());
        self.lines.push("Count:1".to_string());
        self.lines.push("Post scriptum:".to_string());
        let mut body = self.lines.join("\n");
        body.push('\n');
        body
    }
}

impl Default for MappingWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Gzip-compress `raw`.
#[allow(dead_code)]
pub fn gzip(raw: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).expect("Failed to compress");
    encoder.finish().expect("Failed to finish gzip stream")
}

/// A compiled document with its source and mapping file.
#[allow(dead_code)] // Fields used across different integration test crates
pub struct DocProject {
    pub workspace: TempWorkspace,
    pub tex: PathBuf,
    pub pdf: PathBuf,
}

#[allow(dead_code)]
impl DocProject {
    /// Body of the mapping file: line 10 of `tex` on page 1.
    pub fn mapping(tex: &Path) -> String {
        MappingWriter::new()
            .input(1, tex.display().to_string())
            .offset(0.0, 0.0)
            .open_page(1)
            .open_hbox(1, 10, 100.0, 200.0, 0.0, 20.0)
            .element('x', 1, 10, 100.0, 200.0, None)
            .close_hbox()
            .close_page(1)
            .build()
    }
}

#[allow(dead_code)]
#[fixture]
pub fn doc_project() -> DocProject {
    let workspace = TempWorkspace::new();
    let tex = workspace.create_file("doc.tex", "\\documentclass{article}\n");
    let pdf = workspace.create_file("doc.pdf", "%PDF-1.5\n");
    workspace.create_file("doc.synctex", DocProject::mapping(&tex));
    DocProject { workspace, tex, pdf }
}
