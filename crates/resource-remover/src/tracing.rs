use anyhow::{anyhow, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// Setup the tracing system. This must be done only once, later calls
// fail because a global subscriber is already installed.
pub fn setup_tracing(log_level: &str, log_fmt: &str, log_no_color: bool) -> Result<()> {
    let filter_layer = env_filter(log_level)?;

    match log_fmt {
        "json" => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().json())
            .try_init()?,
        "text" => {
            let fmt_layer = fmt::layer().with_ansi(!log_no_color);

            tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt_layer)
                .try_init()?
        }
        _ => return Err(anyhow!("Unknown log message format")),
    };

    Ok(())
}

pub(crate) fn env_filter(log_level: &str) -> Result<EnvFilter> {
    // some of our dependencies generate trace events too, but we don't care about them ->
    // let's filter them.
    // Directives match target prefixes: `tower` would silence `tower_http` too,
    // which logs every HTTP request.
    Ok(EnvFilter::try_new(log_level)?
        .add_directive("h2=off".parse()?)
        .add_directive("hyper=off".parse()?)
        .add_directive("rustls=off".parse()?))
}
