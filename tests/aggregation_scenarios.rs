use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use m3u_gateway::{
    aggregation::{AggregationEngine, LoadOptions},
    errors::{AppError, ProviderError},
    models::{PlaylistConfig, TAG_PROXY_HEADER},
    proxy::M3uGenerator,
    services::{CatalogRefresher, CatalogStore},
    sources::{ProviderContext, ProviderRegistry},
    utils::HttpClientFactory,
};

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };
        fixture.write(
            "a.m3u",
            "#EXTM3U\n\
             #EXTINF:-1 tvg-id=\"1\" tvg-name=\"One\",One\n\
             http://a/1\n\
             #EXTINF:-1 tvg-id=\"2\" tvg-name=\"Two\",Two\n\
             http://a/2\n",
        );
        fixture.write(
            "b.m3u",
            "#EXTM3U\n\
             #EXTINF:-1 tvg-id=\"1\" tvg-name=\"One B\",One B\n\
             http://b/1\n\
             #EXTINF:-1,No Id\n\
             http://b/anonymous\n",
        );
        fixture.write(
            "c.m3u",
            "#EXTM3U\n\
             #EXTINF:-1 tvg-id=\"3\",Three\n\
             http://c/3\n",
        );
        fixture
    }

    fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.dir.path().join(name), contents).unwrap();
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn document(&self) -> serde_json::Value {
        json!({
            "providers": {
                "A": { "provider": "file", "config": { "source": self.path("a.m3u") } },
                "B": { "provider": "file", "config": { "source": self.path("b.m3u") } },
                "C": { "provider": "file", "config": { "source": self.path("c.m3u") } }
            }
        })
    }
}

fn engine() -> AggregationEngine {
    let client = HttpClientFactory::new(Duration::from_secs(1), Duration::from_secs(2))
        .build()
        .unwrap();
    AggregationEngine::new(
        Arc::new(ProviderRegistry::with_builtin()),
        ProviderContext::new(client),
        LoadOptions::default(),
    )
}

fn config(value: serde_json::Value) -> PlaylistConfig {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_first_provider_wins_duplicate_ids() {
    let fixture = Fixture::new();
    let playlist = engine().load(&config(fixture.document())).await.unwrap();

    let uris: Vec<&str> = playlist.entries.iter().map(|e| e.uri.as_str()).collect();
    assert_eq!(
        uris,
        vec!["http://a/1", "http://a/2", "http://b/anonymous", "http://c/3"]
    );
    assert_eq!(playlist.version, 3);
}

#[tokio::test]
async fn test_priority_changes_the_winner() {
    let fixture = Fixture::new();
    let mut document = fixture.document();
    document["providers_priority"] = json!(["B", "A", "C"]);

    let playlist = engine().load(&config(document)).await.unwrap();
    let one = playlist.search_entry_by_tvg_tag("tvg-id", "1").unwrap();
    assert_eq!(one.uri, "http://b/1");
    assert_eq!(playlist.entries[0].title, "One B");
}

#[tokio::test]
async fn test_overrides_and_channel_order() {
    let fixture = Fixture::new();
    let mut document = fixture.document();
    document["overrides"] = json!([
        { "channel": "1", "url": "https://new", "headers": { "Referer": "http://site" } },
        { "channel": "3", "disabled": true },
        { "channel": "missing", "url": "https://nowhere" }
    ]);
    document["channel_order"] = json!(["2", "1"]);

    let playlist = engine().load(&config(document)).await.unwrap();

    let uris: Vec<&str> = playlist.entries.iter().map(|e| e.uri.as_str()).collect();
    assert_eq!(uris, vec!["http://a/2", "https://new", "http://b/anonymous"]);
    assert_eq!(
        playlist.entries[1].tag_value(TAG_PROXY_HEADER),
        Some("Referer=http://site")
    );

    let rendered = M3uGenerator::new().render(&playlist);
    assert!(rendered.contains("#M3UPROXYHEADER:Referer=http://site\nhttps://new\n"));
}

#[tokio::test]
async fn test_failed_provider_is_skipped() {
    let fixture = Fixture::new();
    let mut document = fixture.document();
    document["providers"]["B"]["config"]["source"] = json!(fixture.path("missing.m3u"));

    let playlist = engine().load(&config(document)).await.unwrap();
    assert_eq!(playlist.stream_count(), 3);
    assert!(playlist.search_entry_by_uri("http://b/anonymous").is_none());
}

#[tokio::test]
async fn test_configuration_errors_are_fatal() {
    let fixture = Fixture::new();

    let mut document = fixture.document();
    document["providers_priority"] = json!(["A", "B"]);
    let err = engine().load(&config(document)).await.unwrap_err();
    assert!(matches!(err, AppError::ConfigurationMismatch { .. }));

    let mut document = fixture.document();
    document["providers"]["C"]["provider"] = json!("ftp");
    let err = engine().load(&config(document)).await.unwrap_err();
    assert!(matches!(err, AppError::ProviderNotAvailable { .. }));

    let mut document = fixture.document();
    document["providers_priority"] = json!(["A", "B", "Z"]);
    let err = engine().load(&config(document)).await.unwrap_err();
    assert!(err.is_configuration_error());
}

#[tokio::test]
async fn test_refresher_publishes_and_keeps_catalog_on_failure() {
    let fixture = Fixture::new();
    fixture.write("playlist.json", &fixture.document().to_string());

    let store = Arc::new(CatalogStore::new());
    let refresher = CatalogRefresher::new(
        Arc::new(engine()),
        store.clone(),
        fixture.dir.path().join("playlist.json"),
        Duration::from_secs(3600),
        CancellationToken::new(),
    );

    assert_eq!(refresher.refresh_once().await.unwrap(), 4);
    assert!(store.updated_at().await.is_some());

    fixture.write("playlist.json", "{ broken");
    assert!(refresher.refresh_once().await.is_err());
    assert_eq!(store.snapshot().await.stream_count(), 4);
}

#[tokio::test]
async fn test_malformed_remote_api_url_fails_the_load() {
    let fixture = Fixture::new();
    let mut document = fixture.document();
    document["providers"]["remote"] = json!({
        "provider": "iptv.org",
        "config": { "api_url": "not a url" }
    });

    let err = engine().load(&config(document)).await.unwrap_err();
    assert!(err.is_configuration_error());
    assert!(matches!(
        err,
        AppError::Provider(ProviderError::InvalidConfig { .. })
    ));
}
