use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {have})")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("unsupported serialized file version {version}")]
    UnsupportedVersion { version: u32 },

    #[error("file is a UnityFS bundle, not a serialized asset file; extract it first")]
    Bundle,

    #[error("invalid header: {message}")]
    InvalidHeader { message: String },

    #[error("string at offset {offset:#x} is not valid UTF-8: {source}")]
    InvalidString {
        offset: usize,
        source: std::string::FromUtf8Error,
    },

    #[error("negative length {len} at offset {offset:#x}")]
    NegativeLength { offset: usize, len: i32 },

    #[error("object {path_id} data range {start:#x}..{end:#x} exceeds file size {file_len:#x}")]
    ObjectOutOfBounds {
        path_id: i64,
        start: usize,
        end: usize,
        file_len: usize,
    },

    #[error("object {path_id} references type index {type_id}, but only {type_count} types are declared")]
    InvalidTypeIndex {
        path_id: i64,
        type_id: i32,
        type_count: usize,
    },

    #[error("type tree nesting exceeds {limit} levels at offset {offset:#x}")]
    TypeTreeTooDeep { offset: usize, limit: usize },

    #[error("object {path_id} not found")]
    ObjectNotFound { path_id: i64 },

    #[error("object {path_id} is not a TextAsset (class id {class_id})")]
    NotTextAsset { path_id: i64, class_id: i32 },

    #[error("payload of {len} bytes exceeds the 2 GiB limit of an aligned array")]
    PayloadTooLarge { len: usize },

    #[error("{what} {value} does not fit in the version {version} layout")]
    Overflow {
        what: &'static str,
        value: u64,
        version: u32,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
