/// Configuration default values
///
/// All default values for configuration options live here, so they can be
/// changed in one place.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Playlist defaults
pub const DEFAULT_PLAYLIST_CONFIG_PATH: &str = "playlist.json";
pub const DEFAULT_REFRESH_INTERVAL: &str = "6h";
pub const DEFAULT_FETCH_TIMEOUT: &str = "30s";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

// Auth defaults
pub const DEFAULT_AUTH_REALM: &str = "m3u-gateway";
