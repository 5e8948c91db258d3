//! Payload bytes to text and back.
//!
//! Payloads are tried as UTF-8, then UTF-16LE, then UTF-16 with BOM detection
//! (falling back to the platform byte order). The first decoding that yields a
//! schema marker wins, and the same encoding is used to write the text back.

use serde::Serialize;

use crate::schema::has_marker;

/// Text encoding a payload was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    /// UTF-16 whose byte order came from a BOM or the platform default.
    Utf16 { big_endian: bool, bom: bool },
}

/// A payload decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    pub text: String,
    pub encoding: TextEncoding,
}

/// Decode a payload, returning `None` if no attempt produces a schema marker.
pub fn decode_payload(bytes: &[u8]) -> Option<DecodedDocument> {
    let attempts: [(TextEncoding, fn(&[u8]) -> Option<String>); 3] = [
        (TextEncoding::Utf8, decode_utf8),
        (TextEncoding::Utf16Le, decode_utf16le),
        (platform_utf16(bytes), decode_utf16_bom),
    ];
    attempts.into_iter().find_map(|(encoding, decode)| {
        let text = decode(bytes)?;
        has_marker(&text).then_some(DecodedDocument { text, encoding })
    })
}

/// Encode text back into the payload's original encoding.
pub fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf16Le => utf16_bytes(text, false, false),
        TextEncoding::Utf16 { big_endian, bom } => utf16_bytes(text, big_endian, bom),
    }
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

fn decode_utf16le(bytes: &[u8]) -> Option<String> {
    decode_utf16(bytes, false)
}

fn decode_utf16_bom(bytes: &[u8]) -> Option<String> {
    match platform_utf16(bytes) {
        TextEncoding::Utf16 { big_endian, bom: true } => decode_utf16(&bytes[2..], big_endian),
        TextEncoding::Utf16 { big_endian, bom: false } => decode_utf16(bytes, big_endian),
        _ => None,
    }
}

/// Byte order for the BOM-detecting UTF-16 attempt.
fn platform_utf16(bytes: &[u8]) -> TextEncoding {
    match bytes {
        [0xFF, 0xFE, ..] => TextEncoding::Utf16 {
            big_endian: false,
            bom: true,
        },
        [0xFE, 0xFF, ..] => TextEncoding::Utf16 {
            big_endian: true,
            bom: true,
        },
        _ => TextEncoding::Utf16 {
            big_endian: cfg!(target_endian = "big"),
            bom: false,
        },
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

fn utf16_bytes(text: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2 + 2);
    let units = bom.then_some(0xFEFF).into_iter().chain(text.encode_utf16());
    for unit in units {
        if big_endian {
            out.extend_from_slice(&unit.to_be_bytes());
        } else {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    }
    out
}
