//! Subscriber installation.
//!
//! JSON lines on stdout, filtered by `RUST_LOG`. Span fields recorded by
//! `#[instrument]` (order ids, product ids, notification counts) are flattened
//! into each event so a single log line carries its request context.

use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparsable. sqlx logs every statement at info.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global subscriber. Returns false if one was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init(DEFAULT_FILTER);
        assert!(!init(DEFAULT_FILTER));
    }
}
