//! Tracing setup for the binary.
//!
//! - `HANZIDR_LOG` holds the filter directives (default `warn`).
//! - `HANZIDR_LOG_FORMAT=json` switches to structured JSON lines.
//!
//! Logs go to stderr so they never interleave with the practice prompt.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("HANZIDR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match std::env::var("HANZIDR_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
