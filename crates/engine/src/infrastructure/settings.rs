//! Shard configuration from environment variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shardline_domain::ServerId;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_WORLD_DATA_PATH: &str = "world.json";
const DEFAULT_HANDOFF_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PENDING_ARRIVAL_TTL_SECS: u64 = 60;

/// Runtime settings of one shard process.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardSettings {
    /// This process's server identifier
    pub server_id: ServerId,
    pub host: String,
    pub port: u16,
    pub world_data_path: PathBuf,
    /// Upper bound on a single gateway transfer
    pub handoff_timeout: Duration,
    /// Gateway base URL of every peer server
    pub gateway_peers: HashMap<ServerId, String>,
    /// How long a transferred account waits for its player to reconnect
    pub pending_arrival_ttl: Duration,
    pub cors_allowed_origins: Option<String>,
}

impl Default for ShardSettings {
    fn default() -> Self {
        Self {
            server_id: ServerId::new(0),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            world_data_path: PathBuf::from(DEFAULT_WORLD_DATA_PATH),
            handoff_timeout: Duration::from_millis(DEFAULT_HANDOFF_TIMEOUT_MS),
            gateway_peers: HashMap::new(),
            pending_arrival_ttl: Duration::from_secs(DEFAULT_PENDING_ARRIVAL_TTL_SECS),
            cors_allowed_origins: None,
        }
    }
}

impl ShardSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_id = parse_or("SHARD_SERVER_ID", &lookup, 0i32);
        let port = lookup("SHARD_PORT")
            .or_else(|| lookup("PORT"))
            .map(|raw| parse_value("SHARD_PORT", &raw, DEFAULT_PORT))
            .unwrap_or(DEFAULT_PORT);
        let handoff_ms = parse_or("HANDOFF_TIMEOUT_MS", &lookup, DEFAULT_HANDOFF_TIMEOUT_MS);
        let ttl_secs = parse_or(
            "PENDING_ARRIVAL_TTL_SECS",
            &lookup,
            DEFAULT_PENDING_ARRIVAL_TTL_SECS,
        );

        Self {
            server_id: ServerId::new(server_id),
            host: lookup("SHARD_HOST").unwrap_or(defaults.host),
            port,
            world_data_path: lookup("WORLD_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.world_data_path),
            handoff_timeout: Duration::from_millis(handoff_ms),
            gateway_peers: lookup("GATEWAY_PEERS")
                .map(|raw| parse_peers(&raw))
                .unwrap_or_default(),
            pending_arrival_ttl: Duration::from_secs(ttl_secs),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| parse_value(key, &raw, default))
        .unwrap_or(default)
}

fn parse_value<T: FromStr + Copy>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = raw, "Malformed setting, using default");
            default
        }
    }
}

/// Parse `1=http://a:3000,2=http://b:3000`.
fn parse_peers(raw: &str) -> HashMap<ServerId, String> {
    let mut peers = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = entry
            .split_once('=')
            .and_then(|(id, url)| Some((id.trim().parse::<i32>().ok()?, url.trim())))
            .filter(|(_, url)| !url.is_empty());
        match parsed {
            Some((id, url)) => {
                peers.insert(ServerId::new(id), url.trim_end_matches('/').to_string());
            }
            None => tracing::warn!(entry, "Skipping malformed GATEWAY_PEERS entry"),
        }
    }
    peers
}
