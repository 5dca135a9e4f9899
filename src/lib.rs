pub mod cli;
pub mod types;
pub mod xmlutils;
pub mod timeparse;
pub mod soap;
pub mod discovery;
pub mod sweep;

pub use sweep::run;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for diagnostic output. `RUST_LOG` overrides the default.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fritz_sweep=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
