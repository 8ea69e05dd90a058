//! Forward and backward search over a parsed [`DocumentIndex`](crate::synctex::DocumentIndex).
//!
//! Forward search maps a source line to a point on a rendered page; backward
//! search maps a clicked point back to the closest source line. Both work in
//! PDF big points with the index offset already applied to their results.

pub mod backward;
pub mod forward;
pub mod geometry;
pub(crate) mod resolve;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use backward::backward;
pub use forward::{forward, interpolate_bottom};
pub use geometry::Rectangle;

/// Point on a rendered page a source line maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForwardResult {
    pub page: u32,
    pub x: f64,
    pub y: f64,
}

/// Source position a clicked point maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackwardResult {
    pub input: PathBuf,
    pub line: u32,
    /// Always 0; the mapping file carries no column information.
    pub column: u32,
}
