/// Development helper: initialize a `tracing` subscriber when `RUST_LOG` is
/// set.
///
/// Tests and example binaries can call `groundcontrol::dev_tracing::init_tracing()`
/// to enable structured logging for debugging. This is a no-op when
/// `RUST_LOG` is unset or a global subscriber is already installed. The
/// library itself never calls this -- only the embedding program decides
/// whether a subscriber exists.
pub fn init_tracing() {
    use std::env;

    if env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}
