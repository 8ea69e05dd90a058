//! In-memory representation of a decoded mapping file.

use std::collections::BTreeMap;
use std::fmt;

/// Raw input file name as it appears in the mapping file.
///
/// The bytes are kept undecoded: the encoding TeX used when writing the name is
/// unknown, so decoding is left to path resolution.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputName(Vec<u8>);

impl InputName {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy UTF-8 rendering, for messages only.
    pub fn display_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Debug for InputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.display_lossy())
    }
}

impl fmt::Display for InputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for InputName {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

/// Record type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `x`: current position
    Current,
    /// `k`
    Kern,
    /// `g`
    Glue,
    /// `$`
    Math,
    /// `r`
    Rule,
    /// `h`: void horizontal box
    VoidHBox,
    /// `v`: void vertical box
    VoidVBox,
    /// `(`: horizontal box with content
    HBox,
    /// `[`: vertical box with content
    VBox,
    Other(u8),
}

impl BlockKind {
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            b'x' => Self::Current,
            b'k' => Self::Kern,
            b'g' => Self::Glue,
            b'$' => Self::Math,
            b'r' => Self::Rule,
            b'h' => Self::VoidHBox,
            b'v' => Self::VoidVBox,
            b'(' => Self::HBox,
            b'[' => Self::VBox,
            other => Self::Other(other),
        }
    }

    /// Boxes that contain nested records.
    pub const fn is_composite(self) -> bool {
        matches!(self, Self::HBox | Self::VBox)
    }
}

/// A rectangular primitive of the rendered output, in PDF big points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub page: u32,
    pub left: f64,
    pub bottom: f64,
    pub height: f64,
    pub width: Option<f64>,
}

impl Block {
    /// Whether the block has a visual footprint usable for synchronization.
    ///
    /// Composite boxes, kerns and rules are excluded.
    pub const fn is_eligible(&self) -> bool {
        !self.kind.is_composite() && !matches!(self.kind, BlockKind::Kern | BlockKind::Rule)
    }
}

/// Global offset applied to every coordinate of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// Blocks of one source line, grouped by page.
pub type PageBlocks = BTreeMap<u32, Vec<Block>>;

/// All recorded lines of one input file.
pub type LineMap = BTreeMap<u32, PageBlocks>;

/// Decoded mapping file.
///
/// Input files keep the order in which the mapping file declared them; lines
/// and pages iterate in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentIndex {
    version: String,
    offset: Offset,
    page_count: u32,
    inputs: Vec<(InputName, LineMap)>,
}

impl DocumentIndex {
    pub fn builder() -> DocumentIndexBuilder {
        DocumentIndexBuilder::default()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub const fn offset(&self) -> Offset {
        self.offset
    }

    /// Highest page number opened in the mapping file.
    pub const fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&InputName, &LineMap)> {
        self.inputs.iter().map(|(name, lines)| (name, lines))
    }

    pub fn input_names(&self) -> impl Iterator<Item = &InputName> {
        self.inputs.iter().map(|(name, _)| name)
    }

    pub fn lines(&self, input: &InputName) -> Option<&LineMap> {
        self.inputs
            .iter()
            .find(|(name, _)| name == input)
            .map(|(_, lines)| lines)
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Incremental construction of a [`DocumentIndex`].
#[derive(Debug, Default)]
pub struct DocumentIndexBuilder {
    index: DocumentIndex,
}

impl DocumentIndexBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.index.version = version.into();
        self
    }

    pub fn offset(mut self, offset: Offset) -> Self {
        self.index.offset = offset;
        self
    }

    pub(crate) fn set_offset_x(&mut self, x: f64) {
        self.index.offset.x = x;
    }

    pub(crate) fn set_offset_y(&mut self, y: f64) {
        self.index.offset.y = y;
    }

    pub(crate) fn set_version(&mut self, version: String) {
        self.index.version = version;
    }

    pub(crate) fn see_page(&mut self, page: u32) {
        self.index.page_count = self.index.page_count.max(page);
    }

    fn declare_input(&mut self, name: InputName) -> &mut LineMap {
        let position = match self.index.inputs.iter().position(|(n, _)| *n == name) {
            Some(position) => position,
            None => {
                self.index.inputs.push((name, LineMap::new()));
                self.index.inputs.len() - 1
            }
        };
        &mut self.index.inputs[position].1
    }

    /// Append a block to `line` of `input`, under the block's page.
    pub fn push(&mut self, input: InputName, line: u32, block: Block) {
        self.see_page(block.page);
        self.declare_input(input)
            .entry(line)
            .or_default()
            .entry(block.page)
            .or_default()
            .push(block);
    }

    /// Chainable form of [`Self::push`].
    pub fn block(mut self, input: impl Into<InputName>, line: u32, block: Block) -> Self {
        self.push(input.into(), line, block);
        self
    }

    pub fn build(self) -> DocumentIndex {
        self.index
    }
}
