//! M3U playlist generation

use std::io::{self, Write};

use crate::models::{render_tvg_tags, Entry, Playlist, Tag, TAG_EXTINF};

const HEADER: &str = "#EXTM3U";

/// Renders playlists as extended M3U
#[derive(Debug, Default, Clone, Copy)]
pub struct M3uGenerator;

impl M3uGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the whole playlist into a string
    pub fn render(&self, playlist: &Playlist) -> String {
        let mut out = String::with_capacity(64 + playlist.entries.len() * 160);
        out.push_str(HEADER);
        out.push('\n');

        for tag in &playlist.tags {
            push_tag_line(&mut out, tag);
        }

        for entry in &playlist.entries {
            render_entry(&mut out, entry);
        }

        out
    }

    /// Stream the playlist into a writer, returning the number of bytes written
    pub fn write_to<W: Write>(&self, playlist: &Playlist, writer: &mut W) -> io::Result<u64> {
        let rendered = self.render(playlist);
        writer.write_all(rendered.as_bytes())?;
        Ok(rendered.len() as u64)
    }
}

fn push_tag_line(out: &mut String, tag: &Tag) {
    out.push('#');
    out.push_str(&tag.tag);
    if !tag.value.is_empty() {
        out.push(':');
        out.push_str(&tag.value);
    }
    out.push('\n');
}

fn render_entry(out: &mut String, entry: &Entry) {
    if entry.tag_value(TAG_EXTINF).is_none() {
        push_tag_line(out, &Tag::new(TAG_EXTINF, extinf_value(entry)));
    }
    for tag in &entry.tags {
        push_tag_line(out, tag);
    }
    out.push_str(&entry.uri);
    out.push('\n');
}

/// EXTINF value for an entry that carries none: `-1 <tvg tags>, <title>`
pub fn extinf_value(entry: &Entry) -> String {
    if entry.tvg_tags.is_empty() {
        format!("-1,{}", entry.title)
    } else {
        format!("-1 {}, {}", render_tvg_tags(&entry.tvg_tags), entry.title)
    }
}
