//! Read-only survey of a container's payload entries.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::decode::{decode_payload, TextEncoding};
use crate::error::CoreError;
use crate::schema::{classify, Schema};
use crate::store::{Container, ContainerStore, EntryId};

/// Strings worth looking for when the caller gives none.
pub const DEFAULT_NEEDLES: &[&str] = &[
    "content.cliffhanger-productions.com",
    "cdn-sro01.cliffhanger-productions.com",
    "/Patches/SRO/StandaloneWindows/live",
    "/SRO/configs/",
    "LauncherConfig.xml",
    "clientBaseConfig",
];

const MAX_DUMP_NAME: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub kind: String,
    pub count: usize,
}

/// An entry that matched a needle or a schema marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryHit {
    pub id: EntryId,
    pub name: String,
    pub size: usize,
    pub schema: Option<Schema>,
    pub encoding: Option<TextEncoding>,
    pub needles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub asset: PathBuf,
    /// Most common kinds first.
    pub kind_counts: Vec<KindCount>,
    pub entries_scanned: usize,
    pub hits: Vec<EntryHit>,
}

/// Scan every payload entry for schema markers and `needles`, optionally
/// dumping hit payloads into `dump_dir`. The container is never written.
pub fn inspect<S: ContainerStore>(
    store: &S,
    asset: &Path,
    needles: &[String],
    dump_dir: Option<&Path>,
) -> Result<InspectReport, CoreError> {
    if !asset.is_file() {
        return Err(CoreError::AssetNotFound {
            path: asset.to_path_buf(),
        });
    }
    let container = store.load(asset)?;

    let mut kind_counts: Vec<KindCount> = container
        .kind_counts()
        .into_iter()
        .map(|(kind, count)| KindCount { kind, count })
        .collect();
    kind_counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.cmp(&b.kind)));

    if let Some(dir) = dump_dir {
        fs::create_dir_all(dir).map_err(|e| CoreError::io("create directory", dir, e))?;
    }
    let container_file = asset
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let entries = container.list_entries()?;
    let mut hits = Vec::new();
    for entry in &entries {
        let matched = find_needles(&entry.raw_bytes, needles);
        let decoded = decode_payload(&entry.raw_bytes);
        let schema = decoded
            .as_ref()
            .map(|d| classify(&d.text))
            .filter(|s| *s != Schema::Unrecognized);
        if matched.is_empty() && schema.is_none() {
            continue;
        }

        let dump_path = match dump_dir {
            Some(dir) => {
                let path = dir.join(dump_file_name(&container_file, &entry.name, entry.id));
                fs::write(&path, &entry.raw_bytes).map_err(|e| CoreError::io("write", &path, e))?;
                Some(path)
            }
            None => None,
        };
        info!(
            entry = %entry.name,
            size = entry.raw_bytes.len(),
            needles = ?matched,
            "hit"
        );
        hits.push(EntryHit {
            id: entry.id,
            name: entry.name.clone(),
            size: entry.raw_bytes.len(),
            schema,
            encoding: decoded.map(|d| d.encoding),
            needles: matched,
            dump_path,
        });
    }

    Ok(InspectReport {
        asset: asset.to_path_buf(),
        kind_counts,
        entries_scanned: entries.len(),
        hits,
    })
}

/// Needles found in `payload`, sorted and deduplicated.
fn find_needles(payload: &[u8], needles: &[String]) -> Vec<String> {
    let mut found: Vec<String> = needles
        .iter()
        .filter(|n| !n.is_empty() && contains(payload, n.as_bytes()))
        .cloned()
        .collect();
    found.sort();
    found.dedup();
    found
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn dump_file_name(container_file: &str, entry_name: &str, id: EntryId) -> String {
    let safe: String = entry_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .take(MAX_DUMP_NAME)
        .collect();
    format!("{container_file}__{safe}__{id}.bin")
}
