use std::collections::HashSet;

use tracing::debug;

use crate::models::Playlist;

/// Merge provider playlists in priority order.
///
/// Entries without a `tvg-id` are always appended. For identified entries the
/// first occurrence wins and later duplicates are dropped.
pub fn merge_playlists<I>(sources: I) -> Playlist
where
    I: IntoIterator<Item = (String, Playlist)>,
{
    let mut target = Playlist::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (name, playlist) in sources {
        let mut added = 0usize;
        let mut skipped = 0usize;

        for entry in playlist.entries {
            if let Some(id) = entry.tvg_id() {
                if seen.contains(id) {
                    debug!("Entry '{}' from {} already present, skipping", id, name);
                    skipped += 1;
                    continue;
                }
                seen.insert(id.to_string());
            }
            target.entries.push(entry);
            added += 1;
        }

        debug!(
            "Merged provider {}: {} added, {} duplicates skipped",
            name, added, skipped
        );
    }

    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, DEFAULT_PLAYLIST_VERSION, TVG_ID};

    fn entry(id: Option<&str>, uri: &str) -> Entry {
        let entry = Entry::new(uri, uri);
        match id {
            Some(id) => entry.with_tvg_tag(TVG_ID, id),
            None => entry,
        }
    }

    fn named(name: &str, entries: Vec<Entry>) -> (String, Playlist) {
        (name.to_string(), Playlist::with_entries(entries))
    }

    #[test]
    fn test_first_occurrence_wins() {
        let merged = merge_playlists(vec![
            named("a", vec![entry(Some("1"), "a1"), entry(Some("2"), "a2")]),
            named("b", vec![entry(Some("1"), "b1"), entry(Some("3"), "b3")]),
        ]);
        let uris: Vec<&str> = merged.entries.iter().map(|e| e.uri.as_str()).collect();
        assert_eq!(uris, vec!["a1", "a2", "b3"]);
        assert_eq!(merged.version, DEFAULT_PLAYLIST_VERSION);
    }

    #[test]
    fn test_entries_without_id_never_merge_away() {
        let merged = merge_playlists(vec![
            named("a", vec![entry(None, "x"), entry(Some(""), "blank")]),
            named("b", vec![entry(None, "x"), entry(Some(""), "blank")]),
        ]);
        assert_eq!(merged.stream_count(), 4);
    }

    #[test]
    fn test_duplicate_within_one_provider() {
        let merged = merge_playlists(vec![named(
            "a",
            vec![entry(Some("1"), "first"), entry(Some("1"), "second")],
        )]);
        assert_eq!(merged.stream_count(), 1);
        assert_eq!(merged.entries[0].uri, "first");
    }

    #[test]
    fn test_merge_is_deterministic() {
        let build = || {
            vec![
                named("a", vec![entry(Some("1"), "a1"), entry(None, "n")]),
                named("b", vec![entry(Some("2"), "b2"), entry(Some("1"), "b1")]),
            ]
        };
        assert_eq!(merge_playlists(build()), merge_playlists(build()));
    }
}
