//! xbind
//!
//! Reads and writes XML documents through typed property mappings.

use clap::Parser;
use tracing::info;
use xbind::{CliConfig, init_logging, run};

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        mapping = %config.mapping.display(),
        type_name = %config.type_name,
        backend = %config.backend,
        "Starting xbind"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&config, &mut out)
}
