use std::borrow::Cow;
use std::fmt;

use encoding_rs::Encoding;

use crate::error::{FrameError, Result};

/// Character encoding used for command lines, headers and payloads.
///
/// Only ASCII-compatible encodings are usable: the line terminator, header
/// delimiter and frame terminator are single ASCII bytes on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(Codec);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Codec {
    Ascii,
    Latin1,
    Whatwg(&'static Encoding),
}

const ASCII_LABELS: &[&str] = &[
    "ascii",
    "us-ascii",
    "us",
    "iso646-us",
    "iso_646.irv:1991",
    "ansi_x3.4-1968",
    "cp367",
    "ibm367",
    "csascii",
];

const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "iso-ir-100",
    "latin1",
    "l1",
    "cp819",
    "ibm819",
    "csisolatin1",
];

/// Targets the WHATWG label table substitutes for a different ISO charset.
/// They disagree with the requested charset on bytes 0x80-0x9F.
const SUBSTITUTED: &[&str] = &["windows-1252", "windows-1254", "windows-874"];

impl TextEncoding {
    pub const UTF_8: TextEncoding = TextEncoding(Codec::Whatwg(encoding_rs::UTF_8));
    pub const ISO_8859_1: TextEncoding = TextEncoding(Codec::Latin1);
    pub const US_ASCII: TextEncoding = TextEncoding(Codec::Ascii);

    /// Resolve an encoding label such as `UTF-8` or `ISO-8859-1`.
    ///
    /// Labels that would resolve to a different charset than the one named
    /// (for example `ISO-8859-9` to `windows-1254`) are rejected.
    pub fn for_label(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        if ASCII_LABELS.contains(&normalized.as_str()) {
            return Ok(Self::US_ASCII);
        }
        if LATIN1_LABELS.contains(&normalized.as_str()) {
            return Ok(Self::ISO_8859_1);
        }

        let unsupported = || FrameError::UnsupportedEncoding(label.to_string());
        let encoding = Encoding::for_label(normalized.as_bytes()).ok_or_else(unsupported)?;
        // UTF-16 variants are neither ASCII-compatible nor encodable.
        if !encoding.is_ascii_compatible() || encoding.output_encoding() != encoding {
            return Err(unsupported());
        }
        let canonical = encoding.name().to_ascii_lowercase();
        if SUBSTITUTED.contains(&canonical.as_str()) && !names_windows_codepage(&normalized) {
            return Err(unsupported());
        }
        Ok(Self(Codec::Whatwg(encoding)))
    }

    /// Canonical name, as sent in the `encoding` header.
    pub fn name(self) -> &'static str {
        match self.0 {
            Codec::Ascii => "US-ASCII",
            Codec::Latin1 => "ISO-8859-1",
            Codec::Whatwg(encoding) => encoding.name(),
        }
    }

    /// Encode text, failing on characters the encoding cannot represent.
    pub fn encode(self, text: &str) -> Result<Cow<'_, [u8]>> {
        let unmappable = || FrameError::UnmappableText {
            encoding: self.name(),
        };
        match self.0 {
            Codec::Ascii if text.is_ascii() => Ok(Cow::Borrowed(text.as_bytes())),
            Codec::Latin1 if encoding_rs::mem::is_str_latin1(text) => {
                Ok(encoding_rs::mem::encode_latin1_lossy(text))
            }
            Codec::Ascii | Codec::Latin1 => Err(unmappable()),
            Codec::Whatwg(encoding) => {
                let (bytes, _, had_errors) = encoding.encode(text);
                if had_errors {
                    return Err(unmappable());
                }
                Ok(bytes)
            }
        }
    }

    /// Decode bytes, failing on malformed sequences.
    pub fn decode(self, bytes: &[u8]) -> Result<Cow<'_, str>> {
        let malformed = || FrameError::MalformedText {
            encoding: self.name(),
        };
        match self.0 {
            Codec::Ascii => std::str::from_utf8(bytes)
                .ok()
                .filter(|text| text.is_ascii())
                .map(Cow::Borrowed)
                .ok_or_else(malformed),
            Codec::Latin1 => Ok(encoding_rs::mem::decode_latin1(bytes)),
            Codec::Whatwg(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .ok_or_else(malformed),
        }
    }

    /// Length in bytes of `text` once encoded.
    pub fn encoded_len(self, text: &str) -> Result<usize> {
        if self == Self::UTF_8 {
            return Ok(text.len());
        }
        self.encode(text).map(|bytes| bytes.len())
    }
}

fn names_windows_codepage(label: &str) -> bool {
    label.starts_with("windows-")
        || label.starts_with("cp12")
        || label.starts_with("x-cp12")
        || label == "dos-874"
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextEncoding").field(&self.name()).finish()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_labels_case_insensitively() {
        assert_eq!(TextEncoding::for_label("utf-8").unwrap(), TextEncoding::UTF_8);
        assert_eq!(TextEncoding::for_label("UTF8").unwrap(), TextEncoding::UTF_8);
        assert_eq!(TextEncoding::UTF_8.name(), "UTF-8");
    }

    #[test]
    fn rejects_unknown_and_non_ascii_compatible() {
        assert!(matches!(
            TextEncoding::for_label("klingon"),
            Err(FrameError::UnsupportedEncoding(_))
        ));
        assert!(matches!(
            TextEncoding::for_label("UTF-16LE"),
            Err(FrameError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn latin1_lengths_differ_from_utf8() {
        let latin1 = TextEncoding::for_label("ISO-8859-1").unwrap();
        assert_eq!(latin1.encoded_len("caf\u{e9}").unwrap(), 4);
        assert_eq!(TextEncoding::UTF_8.encoded_len("caf\u{e9}").unwrap(), 5);
        assert_eq!(latin1.decode(&[0x63, 0x61, 0x66, 0xE9]).unwrap(), "caf\u{e9}");
    }

    #[test]
    fn latin1_keeps_its_name_and_c1_range() {
        let latin1 = TextEncoding::for_label("ISO-8859-1").unwrap();
        assert_eq!(latin1, TextEncoding::ISO_8859_1);
        assert_eq!(latin1.name(), "ISO-8859-1");
        assert_eq!(TextEncoding::for_label("latin1").unwrap(), latin1);
        assert_eq!(latin1.decode(&[0x80, 0x9F]).unwrap(), "\u{80}\u{9f}");
        assert_eq!(latin1.encode("\u{80}").unwrap().as_ref(), &[0x80]);
        assert!(latin1.encode("\u{20ac}").is_err());
    }

    #[test]
    fn windows_1252_is_distinct_from_latin1() {
        let cp1252 = TextEncoding::for_label("windows-1252").unwrap();
        assert_ne!(cp1252, TextEncoding::ISO_8859_1);
        assert_eq!(cp1252.name(), "windows-1252");
        assert_eq!(cp1252.decode(&[0x80]).unwrap(), "\u{20ac}");
    }

    #[test]
    fn substituted_labels_are_rejected() {
        for label in ["ISO-8859-9", "latin5", "TIS-620", "ISO-8859-11"] {
            assert!(
                matches!(
                    TextEncoding::for_label(label),
                    Err(FrameError::UnsupportedEncoding(_))
                ),
                "{label} should be rejected"
            );
        }
        assert!(TextEncoding::for_label("ISO-8859-2").is_ok());
    }

    #[test]
    fn us_ascii_is_strict() {
        let ascii = TextEncoding::for_label("US-ASCII").unwrap();
        assert_eq!(ascii.name(), "US-ASCII");
        assert_eq!(ascii.decode(b"plain").unwrap(), "plain");
        assert!(ascii.decode(&[0x80]).is_err());
        assert!(ascii.encode("caf\u{e9}").is_err());
    }

    #[test]
    fn malformed_and_unmappable_text() {
        assert!(matches!(
            TextEncoding::UTF_8.decode(&[0xFF, 0xFE]),
            Err(FrameError::MalformedText { .. })
        ));
        let latin1 = TextEncoding::for_label("ISO-8859-1").unwrap();
        assert!(matches!(
            latin1.encode("\u{4e2d}"),
            Err(FrameError::UnmappableText { .. })
        ));
    }
}
