//! Mapping input names of the index onto filesystem paths.

use crate::encoding::decoded_candidates;
use crate::path::{is_same_real_path, path_from_bytes};
use crate::synctex::{DocumentIndex, InputName, LineMap};
use std::path::{Path, PathBuf};

/// Spellings of one candidate path: as written, then relative to `base`.
fn spellings(path: PathBuf, base: Option<&Path>) -> Vec<PathBuf> {
    match base {
        Some(base) if path.is_relative() => {
            let joined = base.join(&path);
            vec![path, joined]
        }
        _ => vec![path],
    }
}

/// Raw bytes of the name taken as a path.
fn raw_spellings(name: &InputName, base: Option<&Path>) -> Vec<PathBuf> {
    path_from_bytes(name.as_bytes())
        .map(|path| spellings(path, base))
        .unwrap_or_default()
}

/// Every fallback decoding of the name taken as a path, in priority order.
fn decoded_spellings<'a>(
    name: &'a InputName,
    base: Option<&'a Path>,
) -> impl Iterator<Item = PathBuf> + 'a {
    decoded_candidates(name.as_bytes())
        .flat_map(move |(_, decoded)| spellings(PathBuf::from(decoded), base))
}

/// Find the input of the index that denotes `source`.
///
/// Every name is first compared as raw bytes; only when none matches are the
/// fallback decodings tried.
pub(crate) fn match_input<'a>(
    index: &'a DocumentIndex,
    source: &Path,
    base: Option<&Path>,
) -> Option<(&'a InputName, &'a LineMap)> {
    let direct = index.inputs().find(|(name, _)| {
        raw_spellings(name, base)
            .iter()
            .any(|candidate| is_same_real_path(candidate, source))
    });
    if direct.is_some() {
        return direct;
    }

    index.inputs().find(|(name, _)| {
        decoded_spellings(name, base).any(|candidate| is_same_real_path(&candidate, source))
    })
}

/// First spelling of `name` that exists on the filesystem.
pub(crate) fn resolve_input(name: &InputName, base: Option<&Path>) -> Option<PathBuf> {
    raw_spellings(name, base)
        .into_iter()
        .chain(decoded_spellings(name, base))
        .find(|candidate| candidate.exists())
}
