//! iptv.org remote catalog provider
//!
//! Pulls the public channel and stream listings from the iptv.org API,
//! filters channels by category and country, and joins each kept channel
//! with its first stream.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::factory::decode_provider_config;
use super::traits::{PlaylistProvider, ProviderContext};
use crate::errors::{AppResult, ProviderError, ProviderResult};
use crate::models::{
    render_tvg_tags, Entry, Playlist, Tag, TAG_EXTINF, TAG_EXTVLCOPT, TVG_COUNTRY, TVG_GROUP,
    TVG_ID, TVG_LOGO, TVG_NAME, TVG_TYPE,
};
use crate::utils::{StandardHttpClient, UrlUtils};

pub const DEFAULT_API_URL: &str = "https://iptv-org.github.io/api";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

const GROUP_VALUE: &str = "TV";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IptvOrgConfig {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Channel record from `channels.json`. The API uses `null` freely.
#[derive(Debug, Clone, Deserialize)]
pub struct IptvOrgChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

/// Stream record from `streams.json`
#[derive(Debug, Clone, Deserialize)]
pub struct IptvOrgStream {
    #[serde(default)]
    pub channel: Option<String>,
    pub url: String,
    #[serde(default)]
    pub http_referrer: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IptvOrgProvider {
    client: StandardHttpClient,
    channels_url: String,
    streams_url: String,
    user_agent: String,
    categories: Vec<String>,
    countries: Vec<String>,
}

impl IptvOrgProvider {
    pub const KIND: &'static str = "iptv.org";

    /// Build a provider, resolving both API endpoints up front. A malformed
    /// `api_url` is an `InvalidConfig` error.
    pub fn new(client: StandardHttpClient, config: IptvOrgConfig) -> ProviderResult<Self> {
        let api_url = non_empty(config.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self {
            client,
            channels_url: endpoint(&api_url, "channels.json")?,
            streams_url: endpoint(&api_url, "streams.json")?,
            user_agent: non_empty(config.user_agent)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            categories: config.categories,
            countries: config.countries,
        })
    }

    pub fn from_config(config: &serde_json::Value, ctx: &ProviderContext) -> AppResult<Self> {
        let config: IptvOrgConfig = decode_provider_config(Self::KIND, config)?;
        debug!(
            "iptv.org provider categories={:?} countries={:?}",
            config.categories, config.countries
        );
        Ok(Self::new(ctx.http_client.clone(), config)?)
    }

    /// A channel is kept when it matches any configured category (or none are
    /// configured) and any configured country (or none are configured)
    fn accepts(&self, channel: &IptvOrgChannel) -> bool {
        let in_categories = self.categories.is_empty()
            || channel
                .categories
                .as_deref()
                .is_some_and(|cats| cats.iter().any(|c| self.categories.contains(c)));
        let in_countries = self.countries.is_empty()
            || channel
                .country
                .as_deref()
                .is_some_and(|country| self.countries.iter().any(|c| c == country));
        in_categories && in_countries
    }

    /// Filter channels and join them with their first stream, in channel order
    pub fn build_playlist(
        &self,
        channels: Vec<IptvOrgChannel>,
        streams: Vec<IptvOrgStream>,
    ) -> Playlist {
        let kept: Vec<IptvOrgChannel> = channels.into_iter().filter(|c| self.accepts(c)).collect();
        debug!("{} channels match the iptv.org filters", kept.len());

        let slots: HashMap<&str, usize> = kept
            .iter()
            .enumerate()
            .map(|(index, channel)| (channel.id.as_str(), index))
            .collect();
        let mut matched: Vec<Option<IptvOrgStream>> = vec![None; kept.len()];

        for stream in streams {
            let Some(channel_id) = stream.channel.as_deref().filter(|c| !c.is_empty()) else {
                continue;
            };
            let Some(&slot) = slots.get(channel_id) else {
                continue;
            };
            if matched[slot].is_some() {
                debug!(
                    "Stream for channel {} already added, skipping {}",
                    kept[slot].name, stream.url
                );
                continue;
            }
            matched[slot] = Some(stream);
        }

        let entries: Vec<Entry> = kept
            .iter()
            .zip(matched)
            .filter_map(|(channel, stream)| match stream {
                Some(stream) => Some(self.build_entry(channel, stream)),
                None => {
                    debug!("Channel {} has no stream, skipped", channel.id);
                    None
                }
            })
            .collect();

        Playlist::with_entries(entries)
    }

    fn build_entry(&self, channel: &IptvOrgChannel, stream: IptvOrgStream) -> Entry {
        let user_agent = non_empty(stream.user_agent).unwrap_or_else(|| self.user_agent.clone());
        let referrer = non_empty(stream.http_referrer).or_else(|| {
            channel
                .website
                .as_deref()
                .and_then(UrlUtils::referrer_origin)
        });

        let mut tvg_tags = vec![
            Tag::new(TVG_ID, channel.id.as_str()),
            Tag::new(TVG_NAME, channel.name.as_str()),
            Tag::new(TVG_LOGO, channel.logo.clone().unwrap_or_default()),
            Tag::new(TVG_COUNTRY, channel.country.clone().unwrap_or_default()),
            Tag::new(TVG_GROUP, GROUP_VALUE),
        ];
        if let Some(category) = channel.categories.as_deref().and_then(|c| c.first()) {
            tvg_tags.push(Tag::new(TVG_TYPE, category.as_str()));
        }

        let mut tags = vec![Tag::new(
            TAG_EXTINF,
            format!("-1 {}, {}", render_tvg_tags(&tvg_tags), channel.name),
        )];
        if let Some(referrer) = referrer {
            tags.push(Tag::new(TAG_EXTVLCOPT, format!("http-referer={referrer}")));
        }
        tags.push(Tag::new(
            TAG_EXTVLCOPT,
            format!("http-user-agent={user_agent}"),
        ));

        Entry {
            title: channel.name.clone(),
            uri: stream.url,
            tags,
            tvg_tags,
        }
    }
}

#[async_trait]
impl PlaylistProvider for IptvOrgProvider {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn fetch_playlist(&self) -> ProviderResult<Playlist> {
        let channels: Vec<IptvOrgChannel> = self.client.fetch_json(&self.channels_url).await?;
        debug!("Fetched {} channels from iptv.org", channels.len());

        let streams: Vec<IptvOrgStream> = self.client.fetch_json(&self.streams_url).await?;
        debug!("Fetched {} streams from iptv.org", streams.len());

        let playlist = self.build_playlist(channels, streams);
        info!("iptv.org provided {} entries", playlist.stream_count());
        Ok(playlist)
    }
}

fn endpoint(api_url: &str, document: &str) -> ProviderResult<String> {
    UrlUtils::join(api_url, document).map_err(|e| {
        ProviderError::invalid_config(IptvOrgProvider::KIND, format!("api_url '{api_url}': {e}"))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::HttpClientFactory;
    use rstest::rstest;

    fn channel(id: &str, country: &str, categories: &[&str], website: Option<&str>) -> IptvOrgChannel {
        IptvOrgChannel {
            id: id.to_string(),
            name: format!("{id} TV"),
            country: Some(country.to_string()),
            categories: Some(categories.iter().map(|c| c.to_string()).collect()),
            website: website.map(str::to_string),
            logo: Some(format!("http://logo/{id}.png")),
        }
    }

    fn stream(channel: Option<&str>, url: &str) -> IptvOrgStream {
        IptvOrgStream {
            channel: channel.map(str::to_string),
            url: url.to_string(),
            http_referrer: None,
            user_agent: None,
        }
    }

    fn provider(categories: &[&str], countries: &[&str]) -> IptvOrgProvider {
        IptvOrgProvider::new(
            HttpClientFactory::default().build().unwrap(),
            IptvOrgConfig {
                categories: categories.iter().map(|c| c.to_string()).collect(),
                countries: countries.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[rstest]
    #[case(&[], &[], true)]
    #[case(&["news"], &[], true)]
    #[case(&["sports", "news"], &[], true)]
    #[case(&["sports"], &[], false)]
    #[case(&[], &["PT", "ES"], true)]
    #[case(&[], &["ES"], false)]
    #[case(&["news"], &["ES"], false)]
    fn test_channel_filter(
        #[case] categories: &[&str],
        #[case] countries: &[&str],
        #[case] expected: bool,
    ) {
        let ch = channel("RTP1.pt", "PT", &["news", "general"], None);
        assert_eq!(provider(categories, countries).accepts(&ch), expected);
    }

    #[test]
    fn test_channel_without_categories_fails_category_filter() {
        let mut ch = channel("X.pt", "PT", &[], None);
        ch.categories = None;
        assert!(!provider(&["news"], &[]).accepts(&ch));
        assert!(provider(&[], &[]).accepts(&ch));
    }

    #[test]
    fn test_entry_layout() {
        let p = provider(&[], &[]);
        let playlist = p.build_playlist(
            vec![channel("A.pt", "PT", &["news"], Some("https://www.a.pt/live"))],
            vec![stream(Some("A.pt"), "http://a/live.m3u8")],
        );
        let entry = &playlist.entries[0];
        assert_eq!(entry.title, "A.pt TV");
        assert_eq!(entry.uri, "http://a/live.m3u8");
        let keys: Vec<&str> = entry.tvg_tags.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(
            keys,
            vec![TVG_ID, TVG_NAME, TVG_LOGO, TVG_COUNTRY, TVG_GROUP, TVG_TYPE]
        );
        assert_eq!(entry.tvg_value(TVG_GROUP), Some("TV"));
        assert_eq!(entry.tvg_value(TVG_TYPE), Some("news"));
        assert_eq!(
            entry.tags[0].value,
            "-1 tvg-id=\"A.pt\" tvg-name=\"A.pt TV\" tvg-logo=\"http://logo/A.pt.png\" \
             tvg-country=\"PT\" tvg-group=\"TV\" tvg-type=\"news\", A.pt TV"
        );
        assert_eq!(entry.tags[1], Tag::new(TAG_EXTVLCOPT, "http-referer=https://www.a.pt"));
        assert_eq!(
            entry.tags[2],
            Tag::new(TAG_EXTVLCOPT, format!("http-user-agent={DEFAULT_USER_AGENT}"))
        );
    }

    #[test]
    fn test_stream_overrides_and_missing_referrer() {
        let p = provider(&[], &[]);
        let mut s = stream(Some("B.pt"), "http://b");
        s.user_agent = Some("Custom/1.0".to_string());
        s.http_referrer = Some("http://ref.example".to_string());
        let mut ch = channel("B.pt", "PT", &[], Some("www.b.pt"));
        ch.categories = Some(Vec::new());

        let playlist = p.build_playlist(vec![ch.clone()], vec![s]);
        let entry = &playlist.entries[0];
        assert_eq!(entry.tvg_value(TVG_TYPE), None);
        assert_eq!(entry.tags[1].value, "http-referer=http://ref.example");
        assert_eq!(entry.tags[2].value, "http-user-agent=Custom/1.0");

        // No host in the website, no referrer tag
        let playlist = p.build_playlist(vec![ch], vec![stream(Some("B.pt"), "http://b")]);
        assert_eq!(playlist.entries[0].tags.len(), 2);
    }

    #[test]
    fn test_join_first_stream_wins_in_channel_order() {
        let p = provider(&[], &["PT"]);
        let playlist = p.build_playlist(
            vec![
                channel("Z.pt", "PT", &[], None),
                channel("ES1.es", "ES", &[], None),
                channel("A.pt", "PT", &[], None),
                channel("NoStream.pt", "PT", &[], None),
            ],
            vec![
                stream(None, "http://orphan"),
                stream(Some(""), "http://empty"),
                stream(Some("A.pt"), "http://a/1"),
                stream(Some("ES1.es"), "http://es"),
                stream(Some("Z.pt"), "http://z/1"),
                stream(Some("A.pt"), "http://a/2"),
            ],
        );
        let uris: Vec<&str> = playlist.entries.iter().map(|e| e.uri.as_str()).collect();
        assert_eq!(uris, vec!["http://z/1", "http://a/1"]);
    }

    #[test]
    fn test_config_defaults() {
        let p = IptvOrgProvider::new(
            HttpClientFactory::default().build().unwrap(),
            IptvOrgConfig {
                user_agent: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(p.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(p.channels_url, "https://iptv-org.github.io/api/channels.json");
        assert_eq!(p.streams_url, "https://iptv-org.github.io/api/streams.json");
    }

    #[rstest]
    #[case("not a url")]
    #[case("://missing-scheme")]
    fn test_malformed_api_url_is_rejected(#[case] api_url: &str) {
        let err = IptvOrgProvider::new(
            HttpClientFactory::default().build().unwrap(),
            IptvOrgConfig {
                api_url: Some(api_url.to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig { .. }));
    }

    #[test]
    fn test_decodes_api_nulls() {
        let channels: Vec<IptvOrgChannel> = serde_json::from_str(
            r#"[{"id":"A.pt","name":"A","country":"PT","categories":null,"website":null,"logo":null,"is_nsfw":false}]"#,
        )
        .unwrap();
        assert!(channels[0].categories.is_none());
        let streams: Vec<IptvOrgStream> = serde_json::from_str(
            r#"[{"channel":null,"url":"http://x","http_referrer":null,"user_agent":null,"quality":"720p"}]"#,
        )
        .unwrap();
        assert!(streams[0].channel.is_none());
    }
}
