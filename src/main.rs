use std::path::Path;

use tracing::error;

use bridgecam::{PublisherConfig, TestPatternSource};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match PublisherConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        None => PublisherConfig::default(),
    };

    if let Err(e) = bridgecam::run(config, Box::new(TestPatternSource::new())).await {
        error!("{e}");
        std::process::exit(1);
    }
}
