//! Shared helpers for the command line tools.

pub mod backend;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};

/// Installs the `tracing` subscriber used by every binary.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
