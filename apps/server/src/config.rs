use std::{net::SocketAddr, time::Duration};

use goalcoach_core::constants::{DEFAULT_PROPOSAL_TTL_MINUTES, DEFAULT_SUMMARY_TTL_HOURS};

/// Settings for the optional OpenRouter integration.
#[derive(Clone)]
pub struct OpenRouterSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub coach_cache_ttl_hours: i64,
    pub proposal_ttl_minutes: i64,
    pub client_origin: String,
    /// `None` when no API key is set; the coach then runs rules-only.
    pub openrouter: Option<OpenRouterSettings>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_or("GC_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .expect("Invalid GC_LISTEN_ADDR");
        let db_path = env_or("GC_DB_PATH", "./db/app.db");
        let cors_allow = env_or("GC_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = env_number("GC_REQUEST_TIMEOUT_MS", 30000);

        let openrouter = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|api_key| OpenRouterSettings {
                api_key,
                model: env_or("OPENROUTER_MODEL", goalcoach_ai::DEFAULT_MODEL),
                base_url: env_or("OPENROUTER_BASE_URL", goalcoach_ai::DEFAULT_BASE_URL),
            });

        Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            coach_cache_ttl_hours: env_number("GC_COACH_CACHE_TTL_HOURS", DEFAULT_SUMMARY_TTL_HOURS),
            proposal_ttl_minutes: env_number("GC_PROPOSAL_TTL_MINUTES", DEFAULT_PROPOSAL_TTL_MINUTES),
            client_origin: env_or("GC_CLIENT_ORIGIN", "http://localhost:5173"),
            openrouter,
        }
    }
}
