//! Rectangle algebra over blocks.

use crate::synctex::Block;

/// Initial value of the minimum extrema; any real coordinate displaces it.
const FAR: f64 = 2e16;

/// Axis-aligned rectangle in page coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Rectangle {
    /// Rectangle of a single block. A block without width is a vertical segment.
    pub fn from_block(block: &Block) -> Self {
        let right = match block.width {
            Some(width) if width != 0.0 => block.left + width,
            _ => block.left,
        };
        Self {
            top: block.bottom - block.height,
            bottom: block.bottom,
            left: block.left,
            right,
        }
    }

    /// Smallest rectangle covering every eligible block.
    ///
    /// With no eligible block the result is degenerate; check
    /// [`Self::is_degenerate`] before using it.
    pub fn covering<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        let mut rect = Self {
            top: FAR,
            bottom: 0.0,
            left: FAR,
            right: 0.0,
        };
        for block in blocks.into_iter().filter(|b| b.is_eligible()) {
            rect.bottom = rect.bottom.max(block.bottom);
            rect.top = rect.top.min(block.bottom - block.height);
            rect.left = rect.left.min(block.left);
            if let Some(width) = block.width {
                rect.right = rect.right.max(block.left + width);
            }
        }
        rect
    }

    /// True when no block contributed to a covering rectangle.
    pub fn is_degenerate(&self) -> bool {
        self.left >= FAR || self.top >= FAR
    }

    /// Whether `other` lies fully inside `self`.
    pub fn include(&self, other: &Self) -> bool {
        self.left <= other.left
            && self.right >= other.right
            && self.bottom >= other.bottom
            && self.top <= other.top
    }

    /// Euclidean distance from `(x, y)` to the centre.
    pub fn distance_from_center(&self, x: f64, y: f64) -> f64 {
        let cx = (self.left + self.right) / 2.0;
        let cy = (self.bottom + self.top) / 2.0;
        (cx - x).hypot(cy - y)
    }
}
