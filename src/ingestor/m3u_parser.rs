//! M3U playlist parser
//!
//! Turns extended-M3U text into a [`Playlist`]. Parsing is lenient: lines it
//! cannot make sense of are logged and skipped rather than failing the whole
//! document, since one bad entry should not take a provider offline.

use tracing::{debug, warn};

use crate::models::{Entry, Playlist, Tag, TAG_EXTINF};

const HEADER: &str = "#EXTM3U";
const VERSION_TAG: &str = "EXT-X-VERSION";

/// Extended M3U parser
#[derive(Debug, Default, Clone, Copy)]
pub struct M3uParser;

impl M3uParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse M3U content into a playlist
    pub fn parse(&self, content: &str) -> Playlist {
        let mut playlist = Playlist::default();
        let mut pending: Option<Entry> = None;
        // Tags seen between entries, before the next EXTINF
        let mut loose_tags: Vec<Tag> = Vec::new();
        let mut seen_entry = false;

        for (line_num, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(HEADER) {
                continue;
            }

            if let Some(directive) = line.strip_prefix('#') {
                let tag = parse_tag_line(directive);

                if tag.tag == TAG_EXTINF {
                    if let Some(dangling) = pending.take() {
                        warn!(
                            "EXTINF for '{}' has no stream URL, dropped before line {}",
                            dangling.title,
                            line_num + 1
                        );
                    }
                    let mut entry = parse_extinf(&tag.value);
                    entry.tags.append(&mut loose_tags);
                    entry.tags.push(tag);
                    pending = Some(entry);
                    seen_entry = true;
                } else if let Some(entry) = pending.as_mut() {
                    entry.tags.push(tag);
                } else if !seen_entry {
                    if tag.tag == VERSION_TAG {
                        if let Ok(version) = tag.value.trim().parse() {
                            playlist.version = version;
                        }
                    }
                    playlist.tags.push(tag);
                } else {
                    loose_tags.push(tag);
                }
                continue;
            }

            let mut entry = match pending.take() {
                Some(entry) => entry,
                None => {
                    debug!(
                        "Stream URL without EXTINF metadata at line {}: {}",
                        line_num + 1,
                        line
                    );
                    let mut entry = Entry::new(title_from_uri(line), "");
                    entry.tags.append(&mut loose_tags);
                    entry
                }
            };
            entry.uri = line.to_string();
            playlist.entries.push(entry);
            seen_entry = true;
        }

        if let Some(dangling) = pending {
            warn!(
                "EXTINF for '{}' has no stream URL at end of playlist, dropped",
                dangling.title
            );
        }

        debug!("Parsed {} entries from M3U content", playlist.entries.len());
        playlist
    }
}

/// Split `TAG:value` (the leading `#` already removed)
fn parse_tag_line(directive: &str) -> Tag {
    match directive.split_once(':') {
        Some((tag, value)) => Tag::new(tag.trim(), value),
        None => Tag::new(directive.trim(), ""),
    }
}

/// Parse the value part of an EXTINF line:
/// `-1 tvg-id="id" tvg-logo="logo" group-title="group",Channel Name`
fn parse_extinf(value: &str) -> Entry {
    let (head, title) = match split_unquoted_comma(value) {
        Some(index) => (&value[..index], value[index + 1..].trim()),
        None => (value, ""),
    };

    // The duration comes first and carries no attributes
    let attributes = head
        .trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest)
        .unwrap_or("");

    Entry {
        title: title.to_string(),
        uri: String::new(),
        tags: Vec::new(),
        tvg_tags: parse_attributes(attributes),
    }
}

/// Byte index of the first comma outside a quoted attribute value
fn split_unquoted_comma(value: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (index, ch) in value.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(index),
            _ => {}
        }
    }
    None
}

/// Parse `key="value"` and `key=value` pairs, preserving order
fn parse_attributes(attributes: &str) -> Vec<Tag> {
    let mut attrs = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut in_quotes = false;
    let mut escape_next = false;

    let mut push = |key: &mut String, value: &mut String| {
        let name = key.trim();
        if !name.is_empty() {
            attrs.push(Tag::new(name, std::mem::take(value)));
        }
        key.clear();
        value.clear();
    };

    for ch in attributes.chars() {
        if escape_next {
            value.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_quotes => escape_next = true,
            '"' if in_value => {
                in_quotes = !in_quotes;
                if !in_quotes {
                    push(&mut key, &mut value);
                    in_value = false;
                }
            }
            '=' if !in_value => in_value = true,
            c if c.is_whitespace() && !in_quotes => {
                if in_value {
                    push(&mut key, &mut value);
                    in_value = false;
                } else {
                    key.clear();
                }
            }
            _ => {
                if in_value {
                    value.push(ch);
                } else {
                    key.push(ch);
                }
            }
        }
    }

    if in_value {
        push(&mut key, &mut value);
    }

    attrs
}

/// Fallback title for a bare stream URL: its last path segment
fn title_from_uri(uri: &str) -> String {
    uri.split('?')
        .next()
        .and_then(|path| path.trim_end_matches('/').rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("Unnamed Channel")
        .to_string()
}
