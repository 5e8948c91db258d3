//! Recognized configuration document shapes and their endpoint fields.

use serde::Serialize;
use tracing::warn;

/// Which configuration document a payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Schema {
    BaseConfiguration,
    LauncherConfig,
    Unrecognized,
}

/// How an endpoint field's value is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `host` or `host:port`.
    HostPort,
    /// Absolute URL.
    Url,
}

/// How a rule matches an element's local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    Exact(&'static str),
    Suffix(&'static str),
}

impl TagMatch {
    pub fn matches(self, local_name: &str) -> bool {
        match self {
            TagMatch::Exact(name) => local_name == name,
            TagMatch::Suffix(suffix) => local_name.ends_with(suffix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub tag: TagMatch,
    pub kind: FieldKind,
}

const fn exact(name: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        tag: TagMatch::Exact(name),
        kind,
    }
}

const fn suffix(suffix: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        tag: TagMatch::Suffix(suffix),
        kind,
    }
}

const BASE_CONFIGURATION_FIELDS: &[FieldRule] = &[
    exact("RemoteClientBaseConfigPath", FieldKind::Url),
    exact("AccountServiceAddress", FieldKind::Url),
    exact("MatchmakingServiceAddress", FieldKind::Url),
    exact("ChatAndFriendServiceAddress", FieldKind::Url),
    exact("DebugInfoStorageAddress", FieldKind::Url),
    exact("ServerAddress", FieldKind::HostPort),
    exact("PhotonProxyEndPoint", FieldKind::HostPort),
];

// Service URLs under <Services> vary between launcher builds, hence the suffixes.
const LAUNCHER_CONFIG_FIELDS: &[FieldRule] = &[
    exact("PatchesUrl", FieldKind::Url),
    exact("RemoteConfigUrl", FieldKind::Url),
    suffix("Url", FieldKind::Url),
    suffix("URL", FieldKind::Url),
];

impl Schema {
    /// Root-element marker identifying the schema in decoded text.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Schema::BaseConfiguration => Some("<BaseConfiguration"),
            Schema::LauncherConfig => Some("<LauncherConfig"),
            Schema::Unrecognized => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Schema::BaseConfiguration => "BaseConfiguration",
            Schema::LauncherConfig => "LauncherConfig",
            Schema::Unrecognized => "unrecognized",
        }
    }

    /// Endpoint field rules for this schema.
    pub fn rules(self) -> &'static [FieldRule] {
        match self {
            Schema::BaseConfiguration => BASE_CONFIGURATION_FIELDS,
            Schema::LauncherConfig => LAUNCHER_CONFIG_FIELDS,
            Schema::Unrecognized => &[],
        }
    }

    /// Kind of the endpoint field named `local_name`, if it is one.
    pub fn field_kind(self, local_name: &str) -> Option<FieldKind> {
        self.rules()
            .iter()
            .find(|rule| rule.tag.matches(local_name))
            .map(|rule| rule.kind)
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The schemas that can be recognized, in check order.
pub const RECOGNIZED: [Schema; 2] = [Schema::BaseConfiguration, Schema::LauncherConfig];

/// Whether `text` carries any recognized schema marker.
pub fn has_marker(text: &str) -> bool {
    RECOGNIZED
        .iter()
        .filter_map(|s| s.marker())
        .any(|marker| text.contains(marker))
}

/// Classify a decoded document by its root-element markers.
///
/// A document carrying both markers is ambiguous and classified as
/// [`Schema::Unrecognized`].
pub fn classify(document: &str) -> Schema {
    let found: Vec<Schema> = RECOGNIZED
        .into_iter()
        .filter(|s| s.marker().is_some_and(|marker| document.contains(marker)))
        .collect();
    match found.as_slice() {
        [schema] => *schema,
        [] => Schema::Unrecognized,
        _ => {
            warn!("document contains both <BaseConfiguration and <LauncherConfig markers; skipping");
            Schema::Unrecognized
        }
    }
}
