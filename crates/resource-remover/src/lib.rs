pub mod admission_request;
pub mod admission_response;
pub mod api;
mod certs;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod mutation;
pub mod patch;
pub mod policy;
pub mod quantity;
pub mod skip;
pub mod tracing;

use std::{collections::BTreeSet, net::SocketAddr, sync::Arc};

use ::tracing::info;
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use itertools::Itertools;
use tower_http::trace::{self, TraceLayer};

use crate::{
    api::{
        handlers::{healthz_handler, mutate_hpa_handler, mutate_pod_handler, mutate_replicas_handler},
        state::ApiServerState,
    },
    certs::create_tls_config_and_watch_certificate_changes,
    config::Config,
    mutation::Endpoint,
};

pub struct WebhookServer {
    router: Router,
    addr: SocketAddr,
    tls_config: Option<RustlsConfig>,
}

impl WebhookServer {
    pub async fn new_from_config(config: Config) -> Result<Self> {
        let tls_config = match config.tls_config {
            Some(tls_config) => {
                Some(create_tls_config_and_watch_certificate_changes(tls_config).await?)
            }
            None => None,
        };

        info!(
            endpoints = %config.endpoints.iter().map(Endpoint::path).join(","),
            request_ratio = %config.policy.request_ratio,
            cpu_request_floor_millis = config.policy.cpu_request_floor_millis,
            memory_request_floor_bytes = config.policy.memory_request_floor_bytes,
            excluded_namespaces = %config.policy.excluded_namespaces.iter().join(","),
            "mutation settings"
        );

        let state = Arc::new(ApiServerState {
            policy: config.policy,
        });
        let router = router(state, &config.endpoints);

        Ok(Self {
            router,
            addr: config.addr,
            tls_config,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self) -> Result<()> {
        match self.tls_config {
            Some(tls_config) => {
                info!(addr = %self.addr, "started HTTPS server");
                axum_server::bind_rustls(self.addr, tls_config)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                info!(addr = %self.addr, "started HTTP server");
                axum_server::bind(self.addr)
                    .serve(self.router.into_make_service())
                    .await?;
            }
        }

        Ok(())
    }
}

fn router(state: Arc<ApiServerState>, endpoints: &BTreeSet<Endpoint>) -> Router {
    let mut router = Router::new();
    for endpoint in endpoints {
        router = match endpoint {
            Endpoint::Pods => router.route(endpoint.path(), post(mutate_pod_handler)),
            Endpoint::HorizontalPodAutoscalers => {
                router.route(endpoint.path(), post(mutate_hpa_handler))
            }
            Endpoint::Replicas => router.route(endpoint.path(), post(mutate_replicas_handler)),
        };
    }

    router
        .route("/healthz", get(healthz_handler))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(::tracing::Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(::tracing::Level::INFO)),
        )
}
