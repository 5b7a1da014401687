//! Per-channel override rules
//!
//! Rules are looked up through an id→slot map built once over the merged
//! catalog. Removed entries leave a tombstone in their slot, so removing one
//! entry never shifts the slot of another.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::models::{Entry, OverrideEntry, Playlist, Tag, TAG_PROXY_HEADER, TAG_PROXY_TRANSPORT};
use crate::utils::UrlUtils;

/// Counts of what an override pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideSummary {
    pub applied: usize,
    pub removed: usize,
    pub missing: usize,
}

/// Apply override rules in list order
pub fn apply_overrides(playlist: &mut Playlist, overrides: &[OverrideEntry]) -> OverrideSummary {
    let mut summary = OverrideSummary::default();
    if overrides.is_empty() {
        return summary;
    }

    let mut slots: Vec<Option<Entry>> = std::mem::take(&mut playlist.entries)
        .into_iter()
        .map(Some)
        .collect();

    let mut index: HashMap<String, usize> = HashMap::new();
    for (slot, entry) in slots.iter().enumerate() {
        if let Some(id) = entry.as_ref().and_then(Entry::tvg_id) {
            index.entry(id.to_string()).or_insert(slot);
        }
    }

    for rule in overrides {
        let Some(&slot) = index.get(&rule.channel) else {
            warn!("Override target channel '{}' not found, skipping", rule.channel);
            summary.missing += 1;
            continue;
        };

        if rule.disabled {
            debug!("Override disables channel '{}'", rule.channel);
            slots[slot] = None;
            index.remove(&rule.channel);
            summary.removed += 1;
            continue;
        }

        let Some(entry) = slots[slot].as_mut() else {
            continue;
        };
        apply_rule(entry, rule);
        summary.applied += 1;
    }

    playlist.entries = slots.into_iter().flatten().collect();

    info!(
        "Overrides: {} applied, {} removed, {} targets missing",
        summary.applied, summary.removed, summary.missing
    );
    summary
}

fn apply_rule(entry: &mut Entry, rule: &OverrideEntry) {
    if let Some(url) = rule.replacement_url() {
        debug!("Override replaces URI of '{}'", rule.channel);
        entry.uri = url.to_string();
    }

    for (key, value) in &rule.headers {
        entry
            .tags
            .push(Tag::new(TAG_PROXY_HEADER, format!("{key}={value}")));
    }

    if let Some(proxy) = rule.forwarding_proxy() {
        debug!(
            "Override routes '{}' through {}",
            rule.channel,
            UrlUtils::obfuscate_credentials(proxy)
        );
        entry
            .tags
            .push(Tag::new(TAG_PROXY_TRANSPORT, format!("proxy={proxy}")));
    }
}
