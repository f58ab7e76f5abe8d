//! Tracing setup.
//!
//! LOG_LEVEL holds the filter directives (default keeps `card` and `session`
//! at debug). LOG_FORMAT=json switches to structured JSON lines.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,card=debug,session=debug,zerosum_backend=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
