//! Playlist model
//!
//! In-memory representation of a channel listing. A [`Playlist`] owns its
//! [`Entry`] values outright; copying an entry into another playlist is a
//! full value copy, so mutating a merged catalog never reaches back into the
//! playlist a provider produced.

use serde::{Deserialize, Serialize};

pub mod playlist_config;

pub use playlist_config::*;

/// Playlist format version used for freshly created catalogs
pub const DEFAULT_PLAYLIST_VERSION: u32 = 3;

/// TVG tag keys
pub const TVG_ID: &str = "tvg-id";
pub const TVG_NAME: &str = "tvg-name";
pub const TVG_LOGO: &str = "tvg-logo";
pub const TVG_COUNTRY: &str = "tvg-country";
pub const TVG_GROUP: &str = "tvg-group";
pub const TVG_TYPE: &str = "tvg-type";

/// Entry tag kinds with special meaning to the gateway
pub const TAG_EXTINF: &str = "EXTINF";
pub const TAG_EXTVLCOPT: &str = "EXTVLCOPT";
/// Header injection directive, value is `key=value`
pub const TAG_PROXY_HEADER: &str = "M3UPROXYHEADER";
/// Relay transport override, value is `proxy=<uri>`
pub const TAG_PROXY_TRANSPORT: &str = "M3UPROXYTRANSPORT";

/// A key/value pair attached to an entry or to the playlist document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    pub value: String,
}

impl Tag {
    pub fn new<T: Into<String>, V: Into<String>>(tag: T, value: V) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// Render TVG tags the way they appear inside an EXTINF line:
/// `tvg-id="a" tvg-name="b"`
pub fn render_tvg_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("{}=\"{}\"", t.tag, t.value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One channel/stream record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub uri: String,
    /// Free-form tags and directives, rendered as `#TAG:value` lines
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// EPG/grouping identity tags (`tvg-id`, `tvg-name`, ...)
    #[serde(default)]
    pub tvg_tags: Vec<Tag>,
}

impl Entry {
    pub fn new<T: Into<String>, U: Into<String>>(title: T, uri: U) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper to append a TVG tag
    pub fn with_tvg_tag<T: Into<String>, V: Into<String>>(mut self, tag: T, value: V) -> Self {
        self.tvg_tags.push(Tag::new(tag, value));
        self
    }

    /// Builder-style helper to append an entry tag
    pub fn with_tag<T: Into<String>, V: Into<String>>(mut self, tag: T, value: V) -> Self {
        self.tags.push(Tag::new(tag, value));
        self
    }

    /// Value of the first TVG tag with the given key
    pub fn tvg_value(&self, key: &str) -> Option<&str> {
        self.tvg_tags
            .iter()
            .find(|t| t.tag == key)
            .map(|t| t.value.as_str())
    }

    /// The deduplication key. Empty ids count as missing.
    pub fn tvg_id(&self) -> Option<&str> {
        self.tvg_value(TVG_ID).filter(|id| !id.is_empty())
    }

    /// Value of the first entry tag of the given kind
    pub fn tag_value(&self, tag: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.tag == tag)
            .map(|t| t.value.as_str())
    }

    /// Headers requested through `M3UPROXYHEADER` and `EXTVLCOPT:http-*`
    /// directives, in tag order
    pub fn injected_headers(&self) -> Vec<(String, String)> {
        self.tags
            .iter()
            .filter(|t| t.tag == TAG_PROXY_HEADER || t.tag == TAG_EXTVLCOPT)
            .filter_map(|t| t.value.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Forwarding proxy requested through an `M3UPROXYTRANSPORT` directive.
    /// The last directive wins.
    pub fn transport_proxy(&self) -> Option<&str> {
        self.tags
            .iter()
            .rev()
            .filter(|t| t.tag == TAG_PROXY_TRANSPORT)
            .find_map(|t| t.value.strip_prefix("proxy="))
    }
}

/// An ordered channel listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Document-level tags, rendered after the `#EXTM3U` marker
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

fn default_version() -> u32 {
    DEFAULT_PLAYLIST_VERSION
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYLIST_VERSION)
    }
}

impl Playlist {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            tags: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn stream_count(&self) -> usize {
        self.entries.len()
    }

    pub fn search_entry_by_title(&self, title: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.title == title)
    }

    pub fn search_entry_by_uri(&self, uri: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.uri == uri)
    }

    pub fn search_entry_by_tvg_tag(&self, tag: &str, value: &str) -> Option<&Entry> {
        self.search_entry_index_by_tvg_tag(tag, value)
            .map(|index| &self.entries[index])
    }

    pub fn search_entry_index_by_tvg_tag(&self, tag: &str, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.tvg_value(tag) == Some(value))
    }

    /// Remove the first entry whose TVG tag matches, returning it
    pub fn remove_entry_by_tvg_tag(&mut self, tag: &str, value: &str) -> Option<Entry> {
        self.search_entry_index_by_tvg_tag(tag, value)
            .map(|index| self.entries.remove(index))
    }

    /// Ids of all entries in order, `None` for entries without one
    pub fn tvg_ids(&self) -> Vec<Option<&str>> {
        self.entries.iter().map(Entry::tvg_id).collect()
    }
}
