use crate::cursor::{Cursor, Endian};
use crate::error::{Error, Result};

/// Oldest format version whose header carries the endianness flag up front.
pub(crate) const MIN_VERSION: u32 = 9;
/// Anything above this is almost certainly not a serialized file header.
const MAX_VERSION: u32 = 64;
/// First version with 64-bit header fields and object offsets.
const LARGE_FILES_VERSION: u32 = 22;
/// Legacy (non-blob) type trees are recursive; cap the depth we follow.
const MAX_TYPE_TREE_DEPTH: usize = 256;

/// The fixed-layout header at the start of every serialized file.
///
/// Header integers are always big-endian regardless of [`Header::endian`],
/// which governs the metadata and object data that follow.
#[derive(Debug, Clone)]
pub struct Header {
    /// Serialized file format version (not the Unity editor version).
    pub version: u32,
    /// Byte order of metadata and object data.
    pub endian: Endian,
    pub metadata_size: u32,
    pub file_size: u64,
    /// Absolute offset where object data begins.
    pub data_offset: u64,
    /// Header length in bytes; metadata starts here.
    pub len: usize,
}

impl Header {
    /// Absolute offset of the file-size field and whether it is 64-bit.
    pub(crate) fn file_size_field(&self) -> (usize, bool) {
        if self.version >= LARGE_FILES_VERSION {
            (24, true)
        } else {
            (4, false)
        }
    }

    /// Whether object byte offsets are stored as 64-bit values.
    pub fn has_large_offsets(&self) -> bool {
        self.version >= LARGE_FILES_VERSION
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.starts_with(b"UnityFS") || data.starts_with(b"UnityWeb") || data.starts_with(b"UnityRaw") {
            return Err(Error::Bundle);
        }

        let mut c = Cursor::new(data, Endian::Big);
        let mut metadata_size = c.read_u32()?;
        let mut file_size = u64::from(c.read_u32()?);
        let version = c.read_u32()?;
        let mut data_offset = u64::from(c.read_u32()?);

        if version > MAX_VERSION {
            return Err(Error::InvalidHeader {
                message: format!("implausible format version {version}"),
            });
        }
        if version < MIN_VERSION {
            return Err(Error::UnsupportedVersion { version });
        }

        let endian = if c.read_bool()? { Endian::Big } else { Endian::Little };
        c.skip(3)?;

        if version >= LARGE_FILES_VERSION {
            metadata_size = c.read_u32()?;
            file_size = c.read_u64()?;
            data_offset = c.read_u64()?;
            c.skip(8)?;
        }

        let len = c.position();
        if data_offset < len as u64 || data_offset > data.len() as u64 {
            return Err(Error::InvalidHeader {
                message: format!(
                    "data offset {data_offset:#x} outside file of {:#x} bytes",
                    data.len()
                ),
            });
        }

        Ok(Self {
            version,
            endian,
            metadata_size,
            file_size,
            data_offset,
            len,
        })
    }
}

/// A type declared in the metadata type table.
#[derive(Debug, Clone)]
struct SerializedType {
    /// Unity class id (49 = TextAsset, 114 = MonoBehaviour, ...).
    class_id: i32,
}

/// One row of the object table.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Path id, unique within the file.
    pub path_id: i64,
    /// Offset of the object's data relative to [`Header::data_offset`].
    pub byte_start: u64,
    pub byte_size: u32,
    /// Raw type reference: a type table index (v16+) or a class id (older).
    pub type_id: i32,
    /// Resolved Unity class id.
    pub class_id: i32,
    /// Absolute offsets of the `byte_start` and `byte_size` fields, for rewriting.
    pub(crate) byte_start_field: usize,
    pub(crate) byte_size_field: usize,
}

/// Index of the header, type table and object table of a serialized file.
///
/// This is Layer 1: it locates objects but never interprets their data.
/// Tables after the object table (script types, externals, ref types) are left
/// untouched and are carried over verbatim when the file is rewritten.
#[derive(Debug)]
pub struct ObjectIndex {
    header: Header,
    unity_version: String,
    enable_type_tree: bool,
    objects: Vec<ObjectInfo>,
}

impl ObjectIndex {
    /// Parse the header and metadata. `data` must be the entire file contents.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = Header::parse(data)?;
        let version = header.version;

        let mut c = Cursor::new(data, header.endian);
        c.seek(header.len);

        let unity_version = c.read_cstring()?;
        c.read_i32()?; // target platform
        let enable_type_tree = if version >= 13 { c.read_bool()? } else { true };

        let type_count = c.read_len()?;
        let mut types = Vec::with_capacity(type_count.min(4096));
        for _ in 0..type_count {
            types.push(read_type(&mut c, version, enable_type_tree)?);
        }

        let big_ids = if version < 14 { c.read_i32()? != 0 } else { false };

        let object_count = c.read_len()?;
        let mut objects = Vec::with_capacity(object_count.min(1 << 16));
        for _ in 0..object_count {
            let path_id = if big_ids {
                c.read_i64()?
            } else if version < 14 {
                i64::from(c.read_i32()?)
            } else {
                c.align(4)?;
                c.read_i64()?
            };

            let byte_start_field = c.position();
            let byte_start = if version >= LARGE_FILES_VERSION {
                c.read_u64()?
            } else {
                u64::from(c.read_u32()?)
            };
            let byte_size_field = c.position();
            let byte_size = c.read_u32()?;
            let type_id = c.read_i32()?;

            let class_id = if version < 16 {
                i32::from(c.read_u16()?)
            } else {
                usize::try_from(type_id)
                    .ok()
                    .and_then(|i| types.get(i))
                    .map(|t| t.class_id)
                    .ok_or(Error::InvalidTypeIndex {
                        path_id,
                        type_id,
                        type_count: types.len(),
                    })?
            };
            if version < 11 {
                c.read_u16()?; // is destroyed
            }
            if (11..17).contains(&version) {
                c.read_i16()?; // script type index
            }
            if version == 15 || version == 16 {
                c.read_u8()?; // stripped
            }

            let start = header.data_offset.saturating_add(byte_start);
            let end = start.saturating_add(u64::from(byte_size));
            if end > data.len() as u64 {
                return Err(Error::ObjectOutOfBounds {
                    path_id,
                    start: start as usize,
                    end: end as usize,
                    file_len: data.len(),
                });
            }

            objects.push(ObjectInfo {
                path_id,
                byte_start,
                byte_size,
                type_id,
                class_id,
                byte_start_field,
                byte_size_field,
            });
        }

        Ok(Self {
            header,
            unity_version,
            enable_type_tree,
            objects,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Unity editor version string, e.g. `"5.6.7f1"`.
    pub fn unity_version(&self) -> &str {
        &self.unity_version
    }

    pub fn has_type_trees(&self) -> bool {
        self.enable_type_tree
    }

    /// All objects in table order.
    pub fn objects(&self) -> &[ObjectInfo] {
        &self.objects
    }

    /// Find an object by path id.
    pub fn find(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.objects.iter().find(|o| o.path_id == path_id)
    }

    /// Raw data for an object from the file data.
    pub fn object_data<'a>(&self, data: &'a [u8], info: &ObjectInfo) -> &'a [u8] {
        // Bounds were validated in `parse`.
        let start = (self.header.data_offset + info.byte_start) as usize;
        &data[start..start + info.byte_size as usize]
    }
}

fn read_type(c: &mut Cursor<'_>, version: u32, enable_type_tree: bool) -> Result<SerializedType> {
    let class_id = c.read_i32()?;
    if version >= 16 {
        c.read_bool()?; // stripped type
    }
    if version >= 17 {
        c.read_i16()?; // script type index
    }
    if version >= 13 {
        let has_script_id = if version < 16 { class_id < 0 } else { class_id == 114 };
        if has_script_id {
            c.skip(16)?;
        }
        c.skip(16)?; // old type hash
    }
    if enable_type_tree {
        if version >= 12 || version == 10 {
            skip_type_tree_blob(c, version)?;
        } else {
            skip_legacy_type_node(c, 0)?;
        }
        if version >= 21 {
            let deps = c.read_len()?;
            c.skip(deps.saturating_mul(4))?;
        }
    }
    Ok(SerializedType { class_id })
}

fn skip_type_tree_blob(c: &mut Cursor<'_>, version: u32) -> Result<()> {
    let node_count = c.read_len()?;
    let string_buffer_size = c.read_len()?;
    let node_size = if version >= 19 { 32 } else { 24 };
    c.skip(node_count.saturating_mul(node_size))?;
    c.skip(string_buffer_size)
}

fn skip_legacy_type_node(c: &mut Cursor<'_>, depth: usize) -> Result<()> {
    if depth > MAX_TYPE_TREE_DEPTH {
        return Err(Error::TypeTreeTooDeep {
            offset: c.position(),
            limit: MAX_TYPE_TREE_DEPTH,
        });
    }
    c.read_cstring()?; // type name
    c.read_cstring()?; // field name
    // byte size, index, is array, version, meta flags
    c.skip(5 * 4)?;
    let children = c.read_len()?;
    for _ in 0..children {
        skip_legacy_type_node(c, depth + 1)?;
    }
    Ok(())
}
