use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use m3u_gateway::{
    errors::ProviderError,
    models::{TAG_EXTVLCOPT, TVG_COUNTRY, TVG_TYPE},
    sources::{PlaylistProvider, ProviderContext, ProviderRegistry},
    utils::HttpClientFactory,
};

async fn channels() -> Json<Value> {
    Json(json!([
        {
            "id": "RTP1.pt",
            "name": "RTP 1",
            "country": "PT",
            "categories": ["general"],
            "website": "https://www.rtp.pt/play/",
            "logo": "https://logo/rtp1.png"
        },
        {
            "id": "CNN.us",
            "name": "CNN",
            "country": "US",
            "categories": ["news"],
            "website": null,
            "logo": null
        },
        {
            "id": "SIC.pt",
            "name": "SIC",
            "country": "PT",
            "categories": null,
            "website": null,
            "logo": null
        }
    ]))
}

async fn streams() -> Json<Value> {
    Json(json!([
        { "channel": "RTP1.pt", "url": "https://streams/rtp1.m3u8", "http_referrer": null, "user_agent": null },
        { "channel": "RTP1.pt", "url": "https://streams/rtp1-backup.m3u8" },
        { "channel": "CNN.us", "url": "https://streams/cnn.m3u8", "user_agent": "CNNPlayer/1.0" },
        { "channel": null, "url": "https://streams/orphan.m3u8" },
        { "channel": "SIC.pt", "url": "https://streams/sic.m3u8", "http_referrer": "https://sic.pt" }
    ]))
}

async fn not_json() -> &'static str {
    "not json"
}

async fn spawn_api(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn context() -> ProviderContext {
    let client = HttpClientFactory::new(Duration::from_secs(2), Duration::from_secs(5))
        .build()
        .unwrap();
    ProviderContext::new(client)
}

#[tokio::test]
async fn test_fetch_filters_and_joins() {
    let addr = spawn_api(
        Router::new()
            .route("/channels.json", get(channels))
            .route("/streams.json", get(streams)),
    )
    .await;

    let provider = ProviderRegistry::with_builtin()
        .create(
            "iptv.org",
            &json!({ "countries": ["PT"], "api_url": format!("http://{addr}") }),
            &context(),
        )
        .unwrap();
    assert_eq!(provider.kind(), "iptv.org");

    let playlist = provider.fetch_playlist().await.unwrap();
    assert_eq!(playlist.stream_count(), 2);

    let rtp = &playlist.entries[0];
    assert_eq!(rtp.tvg_id(), Some("RTP1.pt"));
    assert_eq!(rtp.uri, "https://streams/rtp1.m3u8");
    assert_eq!(rtp.tvg_value(TVG_COUNTRY), Some("PT"));
    assert_eq!(rtp.tvg_value(TVG_TYPE), Some("general"));
    let options: Vec<&str> = rtp
        .tags
        .iter()
        .filter(|t| t.tag == TAG_EXTVLCOPT)
        .map(|t| t.value.as_str())
        .collect();
    assert_eq!(options[0], "http-referer=https://www.rtp.pt");
    assert!(options[1].starts_with("http-user-agent=Mozilla/5.0"));

    let sic = &playlist.entries[1];
    assert_eq!(sic.uri, "https://streams/sic.m3u8");
    assert_eq!(sic.tvg_value(TVG_TYPE), None);
    assert!(sic
        .tags
        .iter()
        .any(|t| t.value == "http-referer=https://sic.pt"));
}

#[tokio::test]
async fn test_category_filter_and_stream_user_agent() {
    let addr = spawn_api(
        Router::new()
            .route("/channels.json", get(channels))
            .route("/streams.json", get(streams)),
    )
    .await;

    let provider = ProviderRegistry::with_builtin()
        .create(
            "iptv.org",
            &json!({ "categories": ["news"], "api_url": format!("http://{addr}/") }),
            &context(),
        )
        .unwrap();

    let playlist = provider.fetch_playlist().await.unwrap();
    assert_eq!(playlist.stream_count(), 1);
    let cnn = &playlist.entries[0];
    assert_eq!(cnn.title, "CNN");
    assert_eq!(
        cnn.tags.last().map(|t| t.value.as_str()),
        Some("http-user-agent=CNNPlayer/1.0")
    );
}

#[tokio::test]
async fn test_missing_streams_document_fails_the_provider() {
    let addr = spawn_api(Router::new().route("/channels.json", get(channels))).await;

    let provider = ProviderRegistry::with_builtin()
        .create(
            "iptv.org",
            &json!({ "api_url": format!("http://{addr}") }),
            &context(),
        )
        .unwrap();

    let err = provider.fetch_playlist().await.unwrap_err();
    assert!(matches!(err, ProviderError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_malformed_documents_fail_the_provider() {
    for router in [
        Router::new()
            .route("/channels.json", get(channels))
            .route("/streams.json", get(not_json)),
        Router::new()
            .route("/channels.json", get(not_json))
            .route("/streams.json", get(streams)),
    ] {
        let addr = spawn_api(router).await;
        let provider = ProviderRegistry::with_builtin()
            .create(
                "iptv.org",
                &json!({ "api_url": format!("http://{addr}") }),
                &context(),
            )
            .unwrap();

        let err = provider.fetch_playlist().await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }), "{err}");
    }
}

#[tokio::test]
async fn test_wrong_document_shape_fails_the_provider() {
    async fn object() -> Json<Value> {
        Json(json!({ "channels": [] }))
    }

    let addr = spawn_api(
        Router::new()
            .route("/channels.json", get(object))
            .route("/streams.json", get(streams)),
    )
    .await;
    let provider = ProviderRegistry::with_builtin()
        .create(
            "iptv.org",
            &json!({ "api_url": format!("http://{addr}") }),
            &context(),
        )
        .unwrap();

    let err = provider.fetch_playlist().await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode { .. }));
}

#[tokio::test]
async fn test_invalid_payload_is_rejected_at_construction() {
    let err = ProviderRegistry::with_builtin()
        .create("iptv.org", &json!({ "countries": "PT" }), &context())
        .unwrap_err();
    assert!(err.is_configuration_error());

    let err = ProviderRegistry::with_builtin()
        .create("iptv.org", &json!({ "api_url": "not a url" }), &context())
        .unwrap_err();
    assert!(err.is_configuration_error());
}
