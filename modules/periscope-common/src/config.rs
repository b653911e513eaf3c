use std::env;

use tracing::info;

pub const DEFAULT_REASONING_MODEL: &str = "claude-haiku-4-5-20251001";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Reasoning engine
    pub anthropic_api_key: String,
    pub reasoning_model: String,
    pub reasoning_timeout_secs: u64,

    // Detection defaults
    pub min_facts: u32,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            reasoning_model: env::var("REASONING_MODEL")
                .unwrap_or_else(|_| DEFAULT_REASONING_MODEL.to_string()),
            reasoning_timeout_secs: env::var("REASONING_TIMEOUT_SECS")
                .unwrap_or_else(|_| "45".to_string())
                .parse()
                .expect("REASONING_TIMEOUT_SECS must be a number"),
            min_facts: env::var("MIN_FACTS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .expect("MIN_FACTS must be a number"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            database_url = %redact_url(&self.database_url),
            anthropic_api_key = %mask(&self.anthropic_api_key),
            reasoning_model = %self.reasoning_model,
            reasoning_timeout_secs = self.reasoning_timeout_secs,
            min_facts = self.min_facts,
            web_host = %self.web_host,
            web_port = self.web_port,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn mask(secret: &str) -> String {
    if secret.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", &secret[secret.len() - 4..])
    }
}

/// Strip the password portion of a connection URL for logging.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let creds = &url[scheme_end + 3..at];
            match creds.find(':') {
                Some(colon) => format!(
                    "{}{}:****{}",
                    &url[..scheme_end + 3],
                    &creds[..colon],
                    &url[at..]
                ),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
