//! `catalog` binary entrypoint.

use std::process;

use catalog_telemetry::{LoggingConfig, init_logging};

#[tokio::main]
async fn main() {
    match LoggingConfig::from_env("catalog-cli") {
        Ok(config) => {
            if let Err(err) = init_logging(&config) {
                eprintln!("warning: {err}");
            }
        }
        Err(err) => eprintln!("warning: {err}"),
    }
    process::exit(catalog_cli::run().await);
}
