use std::collections::HashMap;

use tracing::debug;

use crate::models::{Entry, Playlist};

/// Move named channels to their ranks in `order`.
///
/// Entry `order[i]` ends up at position `i`. Every other entry keeps its
/// relative order and fills the remaining positions. Ids that are absent or
/// empty, repeated ids, and ranks past the end of the catalog are skipped.
///
/// This is placement, not a sequence of swaps. `["3"]` over `[1, 2, 3]`
/// gives `[3, 1, 2]`, where swapping rank 0 with the named entry would give
/// `[3, 2, 1]`. The two agree when each named entry sits behind its rank and
/// only named entries lie between, as in `["2", "1"]` over `[1, 2]`.
pub fn apply_channel_order(playlist: &mut Playlist, order: &[String]) {
    if order.is_empty() {
        return;
    }

    let len = playlist.entries.len();

    // entry position -> target rank
    let placement: HashMap<usize, usize> = {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (position, entry) in playlist.entries.iter().enumerate() {
            if let Some(id) = entry.tvg_id() {
                positions.entry(id).or_insert(position);
            }
        }

        let mut placement = HashMap::new();
        for (rank, id) in order.iter().enumerate().take(len) {
            match positions.get(id.as_str()) {
                Some(&position) => {
                    placement.entry(position).or_insert(rank);
                }
                None => debug!("Channel '{}' in channel order not found", id),
            }
        }
        placement
    };

    if order.len() > len {
        debug!(
            "Channel order names {} ranks but the catalog has {} entries",
            order.len(),
            len
        );
    }
    if placement.is_empty() {
        return;
    }

    let mut slots: Vec<Option<Entry>> = (0..len).map(|_| None).collect();
    let mut unranked = Vec::with_capacity(len - placement.len());
    for (position, entry) in std::mem::take(&mut playlist.entries).into_iter().enumerate() {
        match placement.get(&position) {
            Some(&rank) => slots[rank] = Some(entry),
            None => unranked.push(entry),
        }
    }

    let mut unranked = unranked.into_iter();
    playlist.entries = slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| unranked.next()))
        .collect();

    debug!("Placed {} channels by explicit order", placement.len());
}
