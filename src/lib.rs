// src/lib.rs

// Top-level modules (each has its own mod.rs or file):
pub mod error;
pub mod config;
pub mod structs_and_impls;
pub mod parser;
pub mod writer;
pub mod external;
pub mod design3d;
pub mod sge;
pub mod blocks;
pub mod modal_analysis;

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins over `verbosity`
/// (0 = info, 1 = debug, 2+ = trace).
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
