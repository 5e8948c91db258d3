//! Per-schema endpoint field rewriting over a parsed document.

use std::collections::BTreeMap;

use tracing::debug;

use crate::endpoint::{rewrite_host_port, rewrite_url};
use crate::markup::{Document, MarkupError};
use crate::schema::{FieldKind, Schema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub patched_text: String,
    /// Fields whose value actually changed; zero is a normal outcome.
    pub changed_field_count: usize,
}

impl RewriteResult {
    fn unchanged(document: &str) -> Self {
        Self {
            patched_text: document.to_string(),
            changed_field_count: 0,
        }
    }
}

/// Rewrite every endpoint field of `document` to point at `new_host`.
///
/// Element names are matched on their local part. URL fields are only touched
/// when their text contains `http://` or `https://`. Untouched bytes are
/// preserved exactly, so a document needing no change comes back identical.
pub fn rewrite_document(schema: Schema, document: &str, new_host: &str) -> Result<RewriteResult, MarkupError> {
    if schema == Schema::Unrecognized {
        return Ok(RewriteResult::unchanged(document));
    }

    let doc = Document::parse(document)?;
    let mut replacements = BTreeMap::new();
    for (idx, element) in doc.elements().iter().enumerate() {
        let Some(text) = element.text.as_ref().filter(|t| !t.value.is_empty()) else {
            continue;
        };
        let Some(kind) = schema.field_kind(element.local_name()) else {
            continue;
        };
        let old = text.value.as_str();
        let new = match kind {
            FieldKind::HostPort => rewrite_host_port(old, new_host),
            FieldKind::Url if looks_like_web_url(old) => rewrite_url(old, new_host),
            FieldKind::Url => continue,
        };
        if new != old {
            debug!(field = element.local_name(), old, new = %new, "rewriting endpoint");
            replacements.insert(idx, new);
        }
    }

    if replacements.is_empty() {
        return Ok(RewriteResult::unchanged(document));
    }
    Ok(RewriteResult {
        patched_text: doc.render(&replacements),
        changed_field_count: replacements.len(),
    })
}

fn looks_like_web_url(value: &str) -> bool {
    value.contains("http://") || value.contains("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<BaseConfiguration xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <ServerAddress>old.example.com:9100</ServerAddress>
  <PhotonProxyEndPoint>old.example.com</PhotonProxyEndPoint>
  <AccountServiceAddress>https://old.example.com/AccountService</AccountServiceAddress>
  <DebugInfoStorageAddress>none</DebugInfoStorageAddress>
  <SomethingUrl>http://old.example.com/ignored</SomethingUrl>
  <Retries>3</Retries>
</BaseConfiguration>
"#;

    #[test]
    fn base_configuration_scenario() {
        let doc = "<BaseConfiguration><ServerAddress>old.example.com:9100</ServerAddress></BaseConfiguration>";
        let result = rewrite_document(Schema::BaseConfiguration, doc, "10.0.0.5").unwrap();
        assert_eq!(result.changed_field_count, 1);
        assert!(result
            .patched_text
            .contains("<ServerAddress>10.0.0.5:9100</ServerAddress>"));
    }

    #[test]
    fn launcher_config_scenario() {
        let doc = "<LauncherConfig><PatchesUrl>https://cdn.old.com:8443/p/live</PatchesUrl></LauncherConfig>";
        let result = rewrite_document(Schema::LauncherConfig, doc, "mirror.local").unwrap();
        assert_eq!(result.changed_field_count, 1);
        assert_eq!(
            result.patched_text,
            "<LauncherConfig><PatchesUrl>https://mirror.local:8443/p/live</PatchesUrl></LauncherConfig>"
        );
    }

    #[test]
    fn base_configuration_uses_static_table_only() {
        let result = rewrite_document(Schema::BaseConfiguration, BASE, "10.0.0.5").unwrap();
        assert_eq!(result.changed_field_count, 3);
        let text = &result.patched_text;
        assert!(text.contains("<ServerAddress>10.0.0.5:9100</ServerAddress>"));
        assert!(text.contains("<PhotonProxyEndPoint>10.0.0.5</PhotonProxyEndPoint>"));
        assert!(text.contains("<AccountServiceAddress>https://10.0.0.5/AccountService</AccountServiceAddress>"));
        assert!(text.contains("<DebugInfoStorageAddress>none</DebugInfoStorageAddress>"));
        assert!(text.contains("<SomethingUrl>http://old.example.com/ignored</SomethingUrl>"));
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BaseConfiguration xmlns:xsi="));
    }

    #[test]
    fn launcher_suffix_fields_and_guard() {
        let doc = r#"<LauncherConfig>
  <Services>
    <NewsFeedUrl>http://old/news?lang=en&amp;v=2</NewsFeedUrl>
    <SupportURL>https://old:444/help#top</SupportURL>
    <LocalUrl>file:///c/readme.txt</LocalUrl>
    <Name>http://old/not-a-field</Name>
  </Services>
</LauncherConfig>"#;
        let result = rewrite_document(Schema::LauncherConfig, doc, "n").unwrap();
        assert_eq!(result.changed_field_count, 2);
        let text = &result.patched_text;
        assert!(text.contains("<NewsFeedUrl>http://n/news?lang=en&amp;v=2</NewsFeedUrl>"));
        assert!(text.contains("<SupportURL>https://n:444/help#top</SupportURL>"));
        assert!(text.contains("<LocalUrl>file:///c/readme.txt</LocalUrl>"));
        assert!(text.contains("<Name>http://old/not-a-field</Name>"));
    }

    #[test]
    fn namespace_prefix_does_not_defeat_matching() {
        let doc = r#"<c:BaseConfiguration xmlns:c="urn:cfg"><c:ServerAddress>old:1</c:ServerAddress></c:BaseConfiguration>"#;
        let result = rewrite_document(Schema::BaseConfiguration, doc, "x").unwrap();
        assert_eq!(result.changed_field_count, 1);
        assert!(result.patched_text.contains("<c:ServerAddress>x:1</c:ServerAddress>"));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let first = rewrite_document(Schema::BaseConfiguration, BASE, "10.0.0.5").unwrap();
        let second = rewrite_document(Schema::BaseConfiguration, &first.patched_text, "10.0.0.5").unwrap();
        assert_eq!(second.changed_field_count, 0);
        assert_eq!(second.patched_text, first.patched_text);
    }

    #[test]
    fn same_host_is_not_a_change() {
        let doc = "<LauncherConfig><PatchesUrl>https://old.com:8443/p</PatchesUrl></LauncherConfig>";
        let result = rewrite_document(Schema::LauncherConfig, doc, "old.com").unwrap();
        assert_eq!(result.changed_field_count, 0);
        assert_eq!(result.patched_text, doc);
    }

    #[test]
    fn cdata_values_stay_cdata() {
        let doc = "<LauncherConfig><PatchesUrl><![CDATA[http://old/a?b=1&c=2]]></PatchesUrl></LauncherConfig>";
        let result = rewrite_document(Schema::LauncherConfig, doc, "n").unwrap();
        assert_eq!(
            result.patched_text,
            "<LauncherConfig><PatchesUrl><![CDATA[http://n/a?b=1&c=2]]></PatchesUrl></LauncherConfig>"
        );
    }

    #[test]
    fn unrecognized_is_returned_verbatim() {
        let doc = "<Settings><ServerAddress>old:1</ServerAddress></Settings>";
        let result = rewrite_document(Schema::Unrecognized, doc, "x").unwrap();
        assert_eq!(result, RewriteResult::unchanged(doc));
    }

    #[test]
    fn malformed_document_is_an_error() {
        let doc = "<BaseConfiguration><ServerAddress>old:1</BaseConfiguration>";
        let err = rewrite_document(Schema::BaseConfiguration, doc, "x").unwrap_err();
        assert!(err.message.contains("mismatched end tag"), "{err}");
    }
}
