//! Text metadata embedded in image containers.
//!
//! The control software annotates every image with `tEXt` fields: a
//! `Creation Time` field and any number of `Comment` fields holding
//! `key: value` pairs. They are found by scanning the raw, still-encoded
//! body for the marker, so no container library internals are involved.

use std::collections::btree_map;
use std::collections::BTreeMap;

use tracing::debug;

/// Reserved key holding the name of the channel a reading came from.
pub const CHANNEL_KEY: &str = "name";
/// Key under which the creation timestamp is stored.
pub const CREATION_TIME_KEY: &str = "Creation Time";

/// Marker that introduces a text field.
pub const TEXT_MARKER: &[u8] = b"tEXt";

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

const CREATION_TIME_PREFIX: &str = "Creation Time\0";
const COMMENT_PREFIX: &str = "Comment\0";
const FIELD_DELIMITER: &str = ": ";

/// String-keyed metadata of one reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    fields: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Insert a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// The channel this reading was requested on.
    pub fn channel(&self) -> Option<&str> {
        self.get(CHANNEL_KEY)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl From<Metadata> for BTreeMap<String, String> {
    fn from(metadata: Metadata) -> Self {
        metadata.fields
    }
}

/// Scan an encoded image body for text fields.
///
/// Each field is laid out as `<length> tEXt <text>`; the text runs for the
/// declared length and is clamped to the end of the body. Fields that are
/// neither a creation time nor a `key: value` pair are skipped.
pub fn extract_text_metadata(body: &[u8]) -> Metadata {
    let mut metadata = Metadata::new();
    let png = body.starts_with(PNG_SIGNATURE);
    let mut from = 0usize;

    while let Some(offset) = find_marker(&body[from..]) {
        let marker = from + offset;
        let text_start = marker + TEXT_MARKER.len();
        from = text_start;

        if marker == 0 {
            continue; // no length in front of the marker
        }

        let declared = declared_length(body, marker, png);
        let text_end = text_start.saturating_add(declared).min(body.len());
        parse_field(&body[text_start..text_end], &mut metadata);
    }

    metadata
}

fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(TEXT_MARKER.len())
        .position(|window| window == TEXT_MARKER)
}

/// Length declared in front of the marker at `marker`.
///
/// The byte right before the marker is the field length. Inside a PNG that
/// byte is the low end of a 4-byte big-endian chunk length, so the full word
/// is read there when it fits inside the body.
fn declared_length(body: &[u8], marker: usize, png: bool) -> usize {
    if png && marker >= 4 {
        let remaining = body.len() - (marker + TEXT_MARKER.len());
        let word = [
            body[marker - 4],
            body[marker - 3],
            body[marker - 2],
            body[marker - 1],
        ];
        let full = u32::from_be_bytes(word) as usize;
        if full <= remaining {
            return full;
        }
    }
    body[marker - 1] as usize
}

fn parse_field(raw: &[u8], metadata: &mut Metadata) {
    // tEXt fields are Latin-1.
    let text: String = raw.iter().map(|&b| char::from(b)).collect();

    if text.contains(CREATION_TIME_KEY) {
        metadata.insert(CREATION_TIME_KEY, text.replace(CREATION_TIME_PREFIX, ""));
        return;
    }

    match text.split_once(FIELD_DELIMITER) {
        Some((key, value)) => {
            let key = key.strip_prefix(COMMENT_PREFIX).unwrap_or(key);
            metadata.insert(key, value);
        }
        None => debug!(field = ?text, "skipping text field without key/value delimiter"),
    }
}
