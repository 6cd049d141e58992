//! Tracing bootstrap. `RUST_LOG` wins when set; the configured filter
//! is the fallback. Call once per process.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init(fallback_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
