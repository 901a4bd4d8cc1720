//! Log targets and subscriber setup.
//!
//! Every role logs under its own target, so a deployment can turn one role up without drowning in
//! the others.

use tracing_subscriber::{
    filter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Target for coordinator logs.
pub const COORDINATOR_TARGET: &str = "anonrep::coordinator";
/// Target for server logs.
pub const SERVER_TARGET: &str = "anonrep::server";
/// Target for client logs.
pub const CLIENT_TARGET: &str = "anonrep::client";
/// Target for task and channel logs.
pub const RUNTIME_TARGET: &str = "anonrep::runtime";

/// Install a global subscriber filtered by `RUST_LOG`, falling back to `info` for this crate.
pub fn init_from_env() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("anonrep=info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init()
}

/// Install a subscriber for the current thread that writes every role's debug logs to the test
/// output. Logging stops when the guard is dropped.
pub fn test_subscriber() -> tracing::subscriber::DefaultGuard {
    let filter = filter::Targets::new()
        .with_default(tracing::Level::WARN)
        .with_target(COORDINATOR_TARGET, tracing::Level::DEBUG)
        .with_target(SERVER_TARGET, tracing::Level::DEBUG)
        .with_target(CLIENT_TARGET, tracing::Level::DEBUG)
        .with_target(RUNTIME_TARGET, tracing::Level::DEBUG);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_test_writer(),
        )
        .with(filter)
        .set_default()
}
