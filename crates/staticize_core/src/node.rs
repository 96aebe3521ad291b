use std::fmt;

/// Identity of a piece of legacy content. Two rows with the same key are the
/// same node; the fetch order (newest first) decides which one wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub node_type: String,
    pub nid: u64,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node_type, self.nid)
    }
}

/// One content row as it comes back from the database, text columns still
/// undecoded. All text columns are declared UTF-8; decoding happens in the
/// transform step so a bad row can be skipped instead of aborting the run.
#[derive(Debug, Clone)]
pub struct RawNode {
    /// Creation time, seconds since the Unix epoch.
    pub created: i64,
    /// Friendly URL path assigned to the node, if any.
    pub alias: Option<Vec<u8>>,
    pub nid: u64,
    pub title: Vec<u8>,
    pub node_type: String,
    pub body: Vec<u8>,
    pub teaser: Vec<u8>,
    /// Resolved author name, not the numeric uid.
    pub author: String,
}

impl RawNode {
    pub fn key(&self) -> NodeKey {
        NodeKey {
            node_type: self.node_type.clone(),
            nid: self.nid,
        }
    }
}

/// Strict UTF-8 decode of a database text column. `None` is the typed
/// "decode failed" outcome; callers decide whether that skips the row.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    String::from_utf8(bytes.to_vec()).ok()
}

/// The path segment a node's permalink is built from: the URL alias when one
/// exists, the `type/id` pair otherwise.
pub fn slug_for(key: &NodeKey, alias: Option<&str>) -> String {
    match alias {
        Some(alias) if !alias.is_empty() => alias.trim_matches('/').to_string(),
        _ => key.to_string(),
    }
}

/// Canonical URL of a node: site base URL + slug + trailing slash.
pub fn permalink_for(site_url: &str, slug: &str) -> String {
    format!("{site_url}{slug}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(node_type: &str, nid: u64) -> NodeKey {
        NodeKey {
            node_type: node_type.to_string(),
            nid,
        }
    }

    #[test]
    fn slug_uses_alias_with_slashes_stripped() {
        assert_eq!(slug_for(&key("blog", 42), Some("/foo/bar/")), "foo/bar");
        assert_eq!(slug_for(&key("blog", 42), Some("foo/bar")), "foo/bar");
    }

    #[test]
    fn slug_falls_back_to_type_and_id() {
        assert_eq!(slug_for(&key("blog", 42), None), "blog/42");
        assert_eq!(slug_for(&key("story", 7), Some("")), "story/7");
    }

    #[test]
    fn permalink_appends_trailing_slash() {
        assert_eq!(
            permalink_for("http://example.com/", "foo/bar"),
            "http://example.com/foo/bar/"
        );
    }

    #[test]
    fn decode_text_rejects_invalid_utf8() {
        assert_eq!(decode_text(b"plain title"), Some("plain title".to_string()));
        assert_eq!(decode_text(&[0xff, 0xfe, 0x41]), None);
    }
}
