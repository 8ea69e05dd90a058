//! Fallback decodings for input file names of unknown encoding.
//!
//! TeX writes file names into the mapping file as raw bytes in whatever
//! encoding the engine used. There is no way to tell which one from the bytes
//! alone, so callers try each decoding below in order and keep the first one
//! that names a file on disk.

use encoding_rs::Encoding;

/// WHATWG labels of the candidate encodings, in priority order.
pub const FALLBACK_LABELS: &[&str] = &[
    "utf-8",
    "ibm866",
    "iso-8859-2",
    "iso-8859-3",
    "iso-8859-4",
    "iso-8859-5",
    "iso-8859-6",
    "iso-8859-7",
    "iso-8859-8",
    "iso-8859-8-i",
    "iso-8859-10",
    "iso-8859-13",
    "iso-8859-14",
    "iso-8859-15",
    "iso-8859-16",
    "koi8-r",
    "koi8-u",
    "macintosh",
    "windows-874",
    "windows-1250",
    "windows-1251",
    "windows-1252",
    "windows-1253",
    "windows-1254",
    "windows-1255",
    "windows-1256",
    "windows-1257",
    "windows-1258",
    "x-mac-cyrillic",
    "gbk",
    "gb18030",
    "big5",
    "euc-jp",
    "iso-2022-jp",
    "shift_jis",
    "euc-kr",
    "utf-16be",
    "utf-16le",
    "x-user-defined",
];

/// The candidate encodings, in priority order.
pub fn fallback_encodings() -> impl Iterator<Item = &'static Encoding> {
    FALLBACK_LABELS
        .iter()
        .filter_map(|label| Encoding::for_label(label.as_bytes()))
}

/// Every well-formed decoding of `raw`, in priority order.
///
/// Decodings that hit malformed input are skipped.
pub fn decoded_candidates(raw: &[u8]) -> impl Iterator<Item = (&'static Encoding, String)> + '_ {
    fallback_encodings().filter_map(move |encoding| {
        match encoding.decode_without_bom_handling_and_without_replacement(raw) {
            Some(text) => Some((encoding, text.into_owned())),
            None => {
                tracing::debug!(encoding = encoding.name(), "Input name is malformed in this encoding");
                None
            }
        }
    })
}
