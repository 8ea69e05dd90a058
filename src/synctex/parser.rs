//! Decoder for the SyncTeX position-mapping format.
//!
//! The format is line oriented. Only the records needed for synchronization are
//! interpreted: the header, input declarations, offsets, pages, boxes and leaf
//! elements. Everything else (`Output:`, `Magnification:`, `Postamble:`, ...)
//! is skipped.

use super::index::{Block, BlockKind, DocumentIndex, DocumentIndexBuilder, InputName};
use crate::error::ParseError;
use flate2::read::MultiGzDecoder;
use regex::bytes::{Captures, Regex};
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Scaled points per PDF big point.
const UNIT: f64 = 65781.76;

const HEADER: &[u8] = b"SyncTeX Version:";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

static INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s-u)^Input:(\d+):(.+)$").expect("valid input pattern"));

static OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^(X|Y) Offset:(-?\d+)").expect("valid offset pattern"));

static OPEN_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^\{(\d+)$").expect("valid page pattern"));

static CLOSE_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^\}(\d+)$").expect("valid page pattern"));

static OPEN_BOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)^([\[(])(\d+),(\d+):(-?\d+),(-?\d+):(-?\d+),(-?\d+),(-?\d+)")
        .expect("valid box pattern")
});

static ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)^([^\[\](){}!])(\d+),(\d+):(-?\d+),(-?\d+)(?::(-?\d+))?")
        .expect("valid element pattern")
});

impl DocumentIndex {
    /// Decode a mapping file, plain or gzip-compressed.
    ///
    /// The plain form is tried first; a body without a SyncTeX header that
    /// carries the gzip magic is decompressed and parsed again.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        match parse_body(raw) {
            Err(ParseError::MissingHeader) if raw.starts_with(&GZIP_MAGIC) => {
                tracing::debug!("Mapping body is not plain text, trying gzip");
                let body = gunzip(raw)?;
                parse_body(&body)
            }
            result => result,
        }
    }
}

fn gunzip(raw: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut body = Vec::new();
    MultiGzDecoder::new(raw)
        .read_to_end(&mut body)
        .map_err(|e| ParseError::Decompress(Arc::new(e)))?;
    Ok(body)
}

/// Parser state while walking the records of one body.
#[derive(Default)]
struct State {
    builder: DocumentIndexBuilder,
    inputs: HashMap<u32, InputName>,
    page: Option<u32>,
    /// Heights of the currently open boxes, innermost last.
    boxes: Vec<f64>,
}

fn parse_body(raw: &[u8]) -> Result<DocumentIndex, ParseError> {
    let mut lines = raw.split(|&b| b == b'\n').map(trim_cr);

    let header = lines.next().unwrap_or_default();
    let Some(version) = header.strip_prefix(HEADER) else {
        return Err(ParseError::MissingHeader);
    };

    let mut state = State::default();
    state
        .builder
        .set_version(String::from_utf8_lossy(version).trim().to_string());

    for (number, line) in lines.enumerate() {
        // Header is line 1.
        state.record(number + 2, line)?;
    }

    let index = state.builder.build();
    tracing::debug!(
        inputs = index.input_names().count(),
        pages = index.page_count(),
        "Parsed mapping file"
    );
    Ok(index)
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl State {
    fn record(&mut self, number: usize, line: &[u8]) -> Result<(), ParseError> {
        if line.is_empty() {
            return Ok(());
        }
        let field = |caps: &Captures<'_>, i: usize| number_at::<i64>(caps, i, number, line);

        if let Some(caps) = INPUT.captures(line) {
            let tag = number_at::<u32>(&caps, 1, number, line)?;
            self.inputs.insert(tag, InputName::new(&caps[2]));
            return Ok(());
        }

        if let Some(caps) = OFFSET.captures(line) {
            let value = field(&caps, 2)? as f64 / UNIT;
            if &caps[1] == b"X" {
                self.builder.set_offset_x(value);
            } else {
                self.builder.set_offset_y(value);
            }
            return Ok(());
        }

        if let Some(caps) = OPEN_PAGE.captures(line) {
            let page = number_at::<u32>(&caps, 1, number, line)?;
            self.builder.see_page(page);
            self.page = Some(page);
            self.boxes.clear();
            return Ok(());
        }

        if CLOSE_PAGE.is_match(line) {
            self.page = None;
            self.boxes.clear();
            return Ok(());
        }

        if let Some(caps) = OPEN_BOX.captures(line) {
            if self.page.is_some() {
                self.boxes.push(field(&caps, 7)? as f64 / UNIT);
            }
            return Ok(());
        }

        if line == b"]" || line == b")" {
            self.boxes.pop();
            return Ok(());
        }

        if let Some(caps) = ELEMENT.captures(line) {
            // Elements only count inside a page and inside a box.
            let (Some(page), Some(&height)) = (self.page, self.boxes.last()) else {
                return Ok(());
            };
            let tag = number_at::<u32>(&caps, 2, number, line)?;
            let Some(input) = self.inputs.get(&tag) else {
                tracing::trace!(tag, line = number, "Element refers to undeclared input");
                return Ok(());
            };
            let source_line = number_at::<u32>(&caps, 3, number, line)?;
            let width = match caps.get(6) {
                Some(_) => Some(field(&caps, 6)? as f64 / UNIT),
                None => None,
            };
            let block = Block {
                kind: BlockKind::from_tag(caps[1][0]),
                page,
                left: field(&caps, 4)? as f64 / UNIT,
                bottom: field(&caps, 5)? as f64 / UNIT,
                height,
                width,
            };
            self.builder.push(input.clone(), source_line, block);
        }

        Ok(())
    }
}

fn number_at<T: FromStr>(
    caps: &Captures<'_>,
    index: usize,
    number: usize,
    line: &[u8],
) -> Result<T, ParseError> {
    caps.get(index)
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::InvalidRecord {
            line: number,
            record: String::from_utf8_lossy(line).into_owned(),
        })
}
