//! Forward search: source line to page position.

use super::ForwardResult;
use super::geometry::Rectangle;
use super::resolve::match_input;
use crate::error::{Result, SyncError};
use crate::synctex::{DocumentIndex, InputName, LineMap, Offset};
use std::path::Path;

/// A recorded line whose first-page blocks have a real covering rectangle.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    line: u32,
    page: u32,
    rect: Rectangle,
}

impl Anchor {
    fn at(&self, y: f64, offset: Offset) -> ForwardResult {
        ForwardResult {
            page: self.page,
            x: self.rect.left + offset.x,
            y: y + offset.y,
        }
    }
}

/// Find the page position of `line` in `source`.
///
/// `base` is the directory of the compiled document; relative input names of
/// the index are also tried against it.
pub fn forward(
    index: &DocumentIndex,
    line: u32,
    source: &Path,
    base: Option<&Path>,
) -> Result<ForwardResult> {
    let Some((input, lines)) = match_input(index, source, base) else {
        tracing::warn!(
            "No input of the mapping file denotes {} under any spelling",
            source.display()
        );
        return Err(SyncError::NoMatchingInput {
            requested: source.to_path_buf(),
            inputs: index.input_names().map(InputName::display_lossy).collect(),
        });
    };
    tracing::debug!(%input, line, "Resolved forward search input");

    let offset = index.offset();
    let recorded: Vec<u32> = lines.keys().copied().collect();
    let split = recorded.partition_point(|&l| l < line);

    let mut upper = None;
    for &l in &recorded[split..] {
        if let Some(anchor) = anchor(input, lines, l)? {
            upper = Some(anchor);
            break;
        }
    }

    let mut lower = None;
    for &l in recorded[..split].iter().rev() {
        if let Some(anchor) = anchor(input, lines, l)? {
            lower = Some(anchor);
            break;
        }
    }

    match (lower, upper) {
        (_, Some(upper)) if upper.line == line => Ok(upper.at(upper.rect.bottom, offset)),
        (None, Some(upper)) => Ok(upper.at(upper.rect.bottom, offset)),
        (Some(lower), Some(upper)) => {
            let y = interpolate_bottom(
                (lower.line, lower.rect.bottom),
                (upper.line, upper.rect.bottom),
                line,
            );
            Ok(upper.at(y, offset))
        }
        // Past the last usable line.
        (Some(lower), None) => Ok(lower.at(lower.rect.bottom, offset)),
        (None, None) => Err(SyncError::MalformedIndex {
            input: input.display_lossy(),
            reason: "no recorded line has a positioned block".to_string(),
        }),
    }
}

/// Covering rectangle of `line` on its first page, if it is not degenerate.
fn anchor(input: &InputName, lines: &LineMap, line: u32) -> Result<Option<Anchor>> {
    let Some((&page, blocks)) = lines.get(&line).and_then(|pages| pages.iter().next()) else {
        return Err(SyncError::MalformedIndex {
            input: input.display_lossy(),
            reason: format!("line {line} has no page association"),
        });
    };
    let rect = Rectangle::covering(blocks);
    if rect.is_degenerate() {
        tracing::trace!(line, "Skipping line without eligible blocks");
        return Ok(None);
    }
    let page = blocks.first().map_or(page, |b| b.page);
    Ok(Some(Anchor { line, page, rect }))
}

/// Vertical position of `line` between two recorded lines.
///
/// Interpolates linearly when the lower line sits above the upper one on the
/// page. Otherwise the layout is not monotonic (floats, reordered material)
/// and the upper line's bottom is used as is.
pub fn interpolate_bottom(
    (line0, bottom0): (u32, f64),
    (line1, bottom1): (u32, f64),
    line: u32,
) -> f64 {
    if bottom0 >= bottom1 || line >= line1 {
        return bottom1;
    }
    if line <= line0 {
        return bottom0;
    }
    let span = f64::from(line1 - line0);
    bottom0 * f64::from(line1 - line) / span + bottom1 * f64::from(line - line0) / span
}
