//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize logging.
///
/// Reads `RAPPORT_LOG` for per-crate levels, e.g.
/// `RAPPORT_LOG=rapport_analysis=debug,rapport_oracle=info`.
/// Falls back to `rapport=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("RAPPORT_LOG")
            .unwrap_or_else(|_| EnvFilter::new("rapport=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init_tracing();
        init_tracing();
        tracing::info!(target: "rapport_core", "tracing initialized");
    }
}
