use std::process;

use anyhow::{anyhow, Result};
use tokio::runtime::Runtime;
use tracing::error;

use resource_remover::{cli, config::Config, tracing::setup_tracing, WebhookServer};

fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let config = match Config::from_args(&matches) {
        Ok(config) => config,
        Err(e) => fatal_error(e.to_string(), false),
    };

    // Starting from rustls 0.22, each application must set its default crypto provider.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install crypto provider"))?;

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => fatal_error(format!("error initializing tokio runtime: {e}"), false),
    };

    runtime.block_on(async {
        if let Err(e) = setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color) {
            fatal_error(e.to_string(), false);
        }

        let server = match WebhookServer::new_from_config(config).await {
            Ok(server) => server,
            Err(e) => fatal_error(format!("cannot start the webhook server: {e:?}"), true),
        };

        if let Err(e) = server.run().await {
            fatal_error(format!("webhook server error: {e:?}"), true);
        }
    });

    Ok(())
}

fn fatal_error(msg: String, trace_system_ready: bool) -> ! {
    if trace_system_ready {
        error!("{}", msg);
    } else {
        eprintln!("{}", msg);
    }

    process::exit(1);
}
