use std::{collections::BTreeSet, net::SocketAddr};

use axum::Router;
use resource_remover::{config::Config, mutation::Endpoint, policy::MutationPolicy, WebhookServer};

pub(crate) fn default_test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        tls_config: None,
        policy: MutationPolicy::default(),
        endpoints: BTreeSet::from(Endpoint::ALL),
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: false,
    }
}

pub(crate) async fn app(config: Config) -> Router {
    let server = WebhookServer::new_from_config(config).await.unwrap();

    server.router()
}
