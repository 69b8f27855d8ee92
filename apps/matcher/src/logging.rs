use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins when set; otherwise the
/// crate logs at `default_level`.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("cv_matcher={default_level},matcher={default_level},cvctl={default_level}"))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
