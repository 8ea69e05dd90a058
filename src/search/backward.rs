//! Backward search: page position to source line.

use super::BackwardResult;
use super::geometry::Rectangle;
use super::resolve::resolve_input;
use crate::error::{Result, SyncError};
use crate::synctex::{DocumentIndex, InputName};
use std::path::Path;

/// Running best candidate of the scan.
struct Candidate<'a> {
    input: &'a InputName,
    line: u32,
    rect: Rectangle,
    distance: f64,
}

impl Candidate<'_> {
    /// Whether a newly examined block supersedes this candidate.
    ///
    /// A block enclosing the current best always wins; otherwise the closer
    /// block wins unless the current best encloses it. Ties keep the earlier
    /// candidate.
    fn superseded_by(&self, rect: &Rectangle, distance: f64) -> bool {
        rect.include(&self.rect) || (!self.rect.include(rect) && distance < self.distance)
    }
}

/// Find the source line under `(x, y)` on `page`.
///
/// Inputs are scanned in declaration order, lines in ascending order. `base`
/// is the directory of the compiled document, used for relative input names.
pub fn backward(
    index: &DocumentIndex,
    page: u32,
    x: f64,
    y: f64,
    base: Option<&Path>,
) -> Result<BackwardResult> {
    let offset = index.offset();
    let (x, y) = (x - offset.x, y - offset.y);

    let mut best: Option<Candidate<'_>> = None;
    for (input, lines) in index.inputs() {
        for (&line, pages) in lines {
            let Some(blocks) = pages.get(&page) else {
                continue;
            };
            for block in blocks.iter().filter(|b| b.is_eligible()) {
                let rect = Rectangle::from_block(block);
                let distance = rect.distance_from_center(x, y);
                if best
                    .as_ref()
                    .is_none_or(|best| best.superseded_by(&rect, distance))
                {
                    best = Some(Candidate {
                        input,
                        line,
                        rect,
                        distance,
                    });
                }
            }
        }
    }

    let Some(best) = best else {
        return Err(SyncError::NoMatch { page });
    };
    tracing::debug!(input = %best.input, line = best.line, distance = best.distance, "Backward search hit");

    let Some(input) = resolve_input(best.input, base) else {
        tracing::warn!("Input {} does not exist under any spelling", best.input);
        return Err(SyncError::UnresolvableInputPath {
            input: best.input.display_lossy(),
        });
    };

    Ok(BackwardResult {
        input,
        line: best.line,
        column: 0,
    })
}
