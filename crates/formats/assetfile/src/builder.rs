//! Synthetic serialized-file builder.
//!
//! Produces small but structurally complete files (header, type table,
//! object table, trailing tables, aligned object data) for fixtures and tests.
//! Every version the reader accepts can be emitted. Before v13 type trees are
//! mandatory, and v9 and v11 use the legacy recursive node layout.

use crate::cursor::{Endian, Writer};
use crate::error::{Error, Result};
use crate::reader::MIN_VERSION;
use crate::text_asset::TEXT_ASSET_CLASS_ID;

/// `BuildTarget.StandaloneWindows`.
const TARGET_PLATFORM: i32 = 5;

struct PendingObject {
    path_id: i64,
    class_id: i32,
    data: Vec<u8>,
}

pub struct SerializedFileBuilder {
    version: u32,
    endian: Endian,
    unity_version: String,
    type_trees: bool,
    big_ids: bool,
    objects: Vec<PendingObject>,
}

impl SerializedFileBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            endian: Endian::Little,
            unity_version: "2019.4.40f1".to_string(),
            type_trees: false,
            big_ids: false,
            objects: Vec::new(),
        }
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn unity_version(mut self, unity_version: &str) -> Self {
        self.unity_version = unity_version.to_string();
        self
    }

    /// Emit a small type tree for every declared type.
    pub fn type_trees(mut self, enabled: bool) -> Self {
        self.type_trees = enabled;
        self
    }

    /// Store path ids as 64-bit values. Only meaningful before v14, where
    /// path ids are otherwise 32-bit; later versions always use 64 bits.
    pub fn big_ids(mut self, enabled: bool) -> Self {
        self.big_ids = enabled;
        self
    }

    /// Add an object with raw data.
    pub fn object(mut self, path_id: i64, class_id: i32, data: Vec<u8>) -> Self {
        self.objects.push(PendingObject {
            path_id,
            class_id,
            data,
        });
        self
    }

    /// Add a `TextAsset` object.
    pub fn text_asset(self, path_id: i64, name: &str, script: &[u8]) -> Self {
        let mut w = Writer::new(self.endian);
        w.write_aligned_bytes(name.as_bytes());
        w.write_aligned_bytes(script);
        let data = w.into_bytes();
        self.object(path_id, TEXT_ASSET_CLASS_ID, data)
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let version = self.version;
        if version < MIN_VERSION {
            return Err(Error::UnsupportedVersion { version });
        }
        let type_trees = self.type_trees || version < 13;
        let big_ids = self.big_ids && version < 14;

        let mut class_ids: Vec<i32> = Vec::new();
        for obj in &self.objects {
            if !class_ids.contains(&obj.class_id) {
                class_ids.push(obj.class_id);
            }
        }

        // Object data layout, relative to the data offset.
        let mut starts = Vec::with_capacity(self.objects.len());
        let mut data_len = 0usize;
        for obj in &self.objects {
            data_len = data_len.next_multiple_of(8);
            starts.push(data_len);
            data_len += obj.data.len();
        }

        let mut m = Writer::new(self.endian);
        m.write_cstring(&self.unity_version);
        m.write_i32(TARGET_PLATFORM);
        if version >= 13 {
            m.write_u8(u8::from(type_trees));
        }

        m.write_i32(class_ids.len() as i32);
        for &class_id in &class_ids {
            m.write_i32(class_id);
            if version >= 16 {
                m.write_u8(0);
            }
            if version >= 17 {
                m.write_i16(-1);
            }
            if version >= 13 {
                let has_script_id = if version < 16 { class_id < 0 } else { class_id == 114 };
                if has_script_id {
                    m.write_bytes(&[0; 16]);
                }
                m.write_bytes(&[0; 16]);
            }
            if type_trees {
                write_type_tree(&mut m, version);
            }
        }

        if version < 14 {
            m.write_i32(i32::from(big_ids));
        }

        m.write_i32(self.objects.len() as i32);
        for (obj, &start) in self.objects.iter().zip(&starts) {
            if big_ids {
                m.write_i64(obj.path_id);
            } else if version < 14 {
                m.write_i32(obj.path_id as i32);
            } else {
                m.align(4);
                m.write_i64(obj.path_id);
            }
            if version >= 22 {
                m.write_u64(start as u64);
            } else {
                m.write_u32(start as u32);
            }
            m.write_u32(obj.data.len() as u32);
            if version >= 16 {
                let type_index = class_ids.iter().position(|&c| c == obj.class_id).unwrap_or(0);
                m.write_i32(type_index as i32);
            } else {
                m.write_i32(obj.class_id);
                m.write_u16(obj.class_id as u16);
            }
            if version < 11 {
                m.write_u16(0); // is destroyed
            }
            if (11..17).contains(&version) {
                m.write_i16(-1);
            }
            if version == 15 || version == 16 {
                m.write_u8(0);
            }
        }

        if version >= 11 {
            m.write_i32(0); // script types
        }
        m.write_i32(0); // externals
        if version >= 20 {
            m.write_i32(0); // ref types
        }
        m.write_cstring(""); // user information
        let metadata = m.into_bytes();

        let header_len = if version >= 22 { 48 } else { 20 };
        let data_offset = (header_len + metadata.len()).next_multiple_of(16);
        let file_size = data_offset + data_len;

        let mut w = Writer::with_capacity(file_size, Endian::Big);
        if version >= 22 {
            w.write_u32(0);
            w.write_u32(0);
            w.write_u32(version);
            w.write_u32(0);
        } else {
            w.write_u32(metadata.len() as u32);
            w.write_u32(file_size as u32);
            w.write_u32(version);
            w.write_u32(data_offset as u32);
        }
        w.write_u8(u8::from(self.endian == Endian::Big));
        w.write_bytes(&[0; 3]);
        if version >= 22 {
            w.write_u32(metadata.len() as u32);
            w.write_u64(file_size as u64);
            w.write_u64(data_offset as u64);
            w.write_u64(0);
        }
        w.write_bytes(&metadata);
        w.align(16);

        for (obj, &start) in self.objects.iter().zip(&starts) {
            while w.position() < data_offset + start {
                w.write_u8(0);
            }
            w.write_bytes(&obj.data);
        }
        Ok(w.into_bytes())
    }
}

/// `Base` root with one `m_Name` child, as a blob or as legacy nodes.
fn write_type_tree(m: &mut Writer, version: u32) {
    if version < 12 && version != 10 {
        write_legacy_type_node(m, "Base", "Base", 1);
        write_legacy_type_node(m, "string", "m_Name", 0);
        return;
    }
    let strings = b"Base\0m_Name\0";
    m.write_i32(2);
    m.write_i32(strings.len() as i32);
    for (level, type_offset, name_offset) in [(0u8, 0u32, 0u32), (1, 5, 5)] {
        m.write_u16(1);
        m.write_u8(level);
        m.write_u8(0);
        m.write_u32(type_offset);
        m.write_u32(name_offset);
        m.write_i32(-1);
        m.write_i32(i32::from(level));
        m.write_i32(0);
        if version >= 19 {
            m.write_u64(0);
        }
    }
    m.write_bytes(strings);
    if version >= 21 {
        m.write_i32(0); // type dependencies
    }
}

/// Node header followed by its child count; children are written by the caller.
fn write_legacy_type_node(m: &mut Writer, type_name: &str, field_name: &str, children: i32) {
    m.write_cstring(type_name);
    m.write_cstring(field_name);
    m.write_i32(-1); // byte size
    m.write_i32(0); // index
    m.write_i32(0); // is array
    m.write_i32(1); // version
    m.write_i32(0); // meta flags
    m.write_i32(children);
}
