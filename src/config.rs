//! Environment configuration. A `.env` file is honoured when present;
//! every knob has a default so a bare environment still boots.

use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Tracing filter, `RUST_LOG` syntax. `VETDESK_LOG`.
    pub log_filter: String,
    /// Lifetime stamped onto issued tokens; `None` means non-expiring.
    /// `VETDESK_TOKEN_TTL_SECS`.
    pub token_ttl_secs: Option<i64>,
    /// Seed the demo dataset on startup. `VETDESK_SEED_DEMO`.
    pub seed_demo_data: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            log_filter: env::var("VETDESK_LOG").unwrap_or_else(|_| "vetdesk=info".into()),
            token_ttl_secs: env::var("VETDESK_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0),
            seed_demo_data: env::var("VETDESK_SEED_DEMO")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "vetdesk=info".into(),
            token_ttl_secs: None,
            seed_demo_data: false,
        }
    }
}
