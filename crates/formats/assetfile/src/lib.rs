//! Reader/writer for Unity serialized asset files (`resources.assets`,
//! `sharedassets*.assets`, `level*`).
//!
//! Three-layer architecture:
//! - **Layer 1** (`reader`/`writer`): header, type table, object table; relocating
//!   object data and patching the table on write
//! - **Layer 2** (`text_asset`): typed decoding of individual objects
//! - **Layer 3** (`serialized`): high-level wrapper with staged replacements
//!
//! Only what is needed to enumerate objects and replace their data is
//! interpreted; all other metadata is carried over byte-for-byte.

pub mod builder;
pub mod classes;
pub mod cursor;
pub mod error;
pub mod reader;
pub mod serialized;
pub mod text_asset;
pub mod writer;

pub use cursor::Endian;
pub use error::{Error, Result};
pub use reader::{Header, ObjectIndex, ObjectInfo};
pub use serialized::SerializedFile;
pub use text_asset::{TextAsset, TEXT_ASSET_CLASS_ID};
