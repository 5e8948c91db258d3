use std::borrow::Cow;

use crate::cursor::{Cursor, Endian, Writer};
use crate::error::{Error, Result};

/// Unity class id of `TextAsset`.
pub const TEXT_ASSET_CLASS_ID: i32 = 49;

/// A decoded `TextAsset` object.
///
/// Layout: `m_Name` (aligned string), `m_Script` (aligned byte array), then any
/// version-specific fields (e.g. `m_PathName` on 4.x), which are kept verbatim
/// in `trailer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAsset {
    name: Vec<u8>,
    /// Raw script payload. Usually text, but Unity stores it as bytes.
    pub script: Vec<u8>,
    trailer: Vec<u8>,
}

impl TextAsset {
    pub fn new(name: &str, script: Vec<u8>) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            script,
            trailer: Vec::new(),
        }
    }

    /// Parse an object's raw data.
    pub fn parse(data: &[u8], endian: Endian) -> Result<Self> {
        let mut c = Cursor::new(data, endian);
        let name = c.read_aligned_bytes()?.to_vec();
        let script = c.read_aligned_bytes()?.to_vec();
        let trailer = data[c.position()..].to_vec();
        Ok(Self {
            name,
            script,
            trailer,
        })
    }

    /// The object name (`m_Name`), lossily decoded.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Serialize back to object data.
    pub fn to_bytes(&self, endian: Endian) -> Result<Vec<u8>> {
        if i32::try_from(self.script.len()).is_err() {
            return Err(Error::PayloadTooLarge {
                len: self.script.len(),
            });
        }
        let mut w = Writer::with_capacity(self.name.len() + self.script.len() + self.trailer.len() + 16, endian);
        w.write_aligned_bytes(&self.name);
        w.write_aligned_bytes(&self.script);
        w.write_bytes(&self.trailer);
        Ok(w.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_trailing_fields() {
        let mut w = Writer::new(Endian::Little);
        w.write_aligned_bytes(b"LauncherConfig");
        w.write_aligned_bytes(b"<LauncherConfig/>");
        w.write_aligned_bytes(b"Assets/LauncherConfig.xml");
        let data = w.into_bytes();

        let asset = TextAsset::parse(&data, Endian::Little).unwrap();
        assert_eq!(asset.name(), "LauncherConfig");
        assert_eq!(asset.script, b"<LauncherConfig/>");
        assert_eq!(asset.to_bytes(Endian::Little).unwrap(), data);
    }

    #[test]
    fn replacing_script_relayouts_padding() {
        let mut asset = TextAsset::new("cfg", b"abc".to_vec());
        asset.script = b"abcdef".to_vec();
        let bytes = asset.to_bytes(Endian::Big).unwrap();
        // 4 + "cfg" + 1 pad, then 4 + "abcdef" + 2 pad
        assert_eq!(bytes.len(), 8 + 12);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 6]);
    }

    #[test]
    fn truncated_script_is_an_error() {
        let mut w = Writer::new(Endian::Little);
        w.write_aligned_bytes(b"x");
        w.write_i32(100);
        w.write_bytes(b"short");
        let data = w.into_bytes();
        assert!(matches!(
            TextAsset::parse(&data, Endian::Little),
            Err(Error::UnexpectedEof { .. })
        ));
    }
}
