//! Locating and loading the mapping file that belongs to a compiled document.

use super::index::DocumentIndex;
use crate::error::{ParseError, Result, SyncError};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Candidate mapping files for a document, in probe order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingLocation {
    /// `<dir>/<stem>.synctex`
    pub plain: PathBuf,
    /// `<dir>/<stem>.synctex.gz`
    pub compressed: PathBuf,
}

/// Modification times of both candidates, `None` where a file is missing.
///
/// Both are recorded because the parse may fall back from a corrupt plain
/// file to the compressed one; a change to either invalidates the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingStamp {
    pub plain: Option<SystemTime>,
    pub compressed: Option<SystemTime>,
}

impl MappingLocation {
    /// Same directory and base name as the document, extension replaced.
    pub fn for_document(document: &Path) -> Self {
        let dir = document
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut name: OsString = document.file_stem().unwrap_or_default().to_os_string();
        name.push(".synctex");
        let plain = dir.join(&name);
        name.push(".gz");
        let compressed = dir.join(name);
        Self { plain, compressed }
    }

    pub fn candidates(&self) -> [&Path; 2] {
        [&self.plain, &self.compressed]
    }

    /// Current stamp of the candidates, or `None` when neither exists.
    pub fn stamp(&self) -> Option<MappingStamp> {
        let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified()).ok();
        let stamp = MappingStamp {
            plain: modified(&self.plain),
            compressed: modified(&self.compressed),
        };
        (stamp.plain.is_some() || stamp.compressed.is_some()).then_some(stamp)
    }
}

/// Parse the mapping file of `document`.
///
/// The plain file is tried before the compressed one. A file that exists but
/// fails to parse is reported as corrupt only if no other candidate succeeds.
pub fn load_mapping(document: &Path) -> Result<DocumentIndex> {
    let location = MappingLocation::for_document(document);
    let mut failure: Option<(PathBuf, ParseError)> = None;

    for candidate in location.candidates() {
        let raw = match std::fs::read(candidate) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", candidate.display(), e);
                failure = Some((candidate.to_path_buf(), ParseError::from(e)));
                continue;
            }
        };

        match DocumentIndex::parse(&raw) {
            Ok(index) => {
                tracing::debug!("Loaded mapping file {}", candidate.display());
                return Ok(index);
            }
            Err(e) => {
                tracing::warn!("Parsing mapping file {} failed: {}", candidate.display(), e);
                failure = Some((candidate.to_path_buf(), e));
            }
        }
    }

    match failure {
        Some((path, source)) => Err(SyncError::CorruptMappingFile { path, source }),
        None => {
            tracing::warn!(
                "Mapping file not found: {} / {}",
                location.plain.display(),
                location.compressed.display()
            );
            Err(SyncError::MissingMappingFile {
                plain: location.plain,
                compressed: location.compressed,
            })
        }
    }
}
