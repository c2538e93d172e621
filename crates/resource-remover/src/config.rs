use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use lazy_static::lazy_static;

use crate::{
    mutation::Endpoint,
    policy::{MutationPolicy, ScalingRatio},
    quantity,
};

lazy_static! {
    pub(crate) static ref HOSTNAME: String =
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"));
}

pub struct Config {
    pub addr: SocketAddr,
    pub tls_config: Option<TlsConfig>,
    pub policy: MutationPolicy,
    pub endpoints: BTreeSet<Endpoint>,
    pub log_level: String,
    pub log_fmt: String,
    pub log_no_color: bool,
}

#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl Config {
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let addr = api_bind_address(matches)?;

        let disable_tls = matches
            .get_one::<bool>("disable-tls")
            .expect("clap should have set a default value")
            .to_owned();
        let tls_config = if disable_tls {
            None
        } else {
            let (cert_file, key_file) = tls_files(matches)?;
            Some(TlsConfig {
                cert_file,
                key_file,
            })
        };

        let policy = mutation_policy(matches)?;
        let endpoints = endpoints(matches)?;

        let log_level = matches
            .get_one::<String>("log-level")
            .expect("This should not happen, there's a default value for log-level")
            .to_owned();
        let log_fmt = matches
            .get_one::<String>("log-fmt")
            .expect("This should not happen, there's a default value for log-fmt")
            .to_owned();
        let log_no_color = matches
            .get_one::<bool>("log-no-color")
            .expect("clap should have assigned a default value")
            .to_owned();

        Ok(Self {
            addr,
            tls_config,
            policy,
            endpoints,
            log_level,
            log_fmt,
            log_no_color,
        })
    }
}

fn api_bind_address(matches: &clap::ArgMatches) -> Result<SocketAddr> {
    format!(
        "{}:{}",
        matches
            .get_one::<String>("address")
            .expect("clap should have set a default value"),
        matches
            .get_one::<String>("port")
            .expect("clap should have set a default value")
    )
    .parse()
    .map_err(|e| anyhow!("error parsing arguments: {}", e))
}

fn tls_files(matches: &clap::ArgMatches) -> Result<(PathBuf, PathBuf)> {
    let cert_file = matches
        .get_one::<String>("cert-file")
        .expect("clap should have set a default value");
    let key_file = matches
        .get_one::<String>("key-file")
        .expect("clap should have set a default value");
    if cert_file.is_empty() || key_file.is_empty() {
        Err(anyhow!(
            "error parsing arguments: both --cert-file and --key-file must be provided, unless --disable-tls is set"
        ))
    } else {
        Ok((PathBuf::from(cert_file), PathBuf::from(key_file)))
    }
}

fn mutation_policy(matches: &clap::ArgMatches) -> Result<MutationPolicy> {
    let request_ratio = matches
        .get_one::<String>("request-ratio")
        .expect("clap should have set a default value")
        .parse::<ScalingRatio>()
        .map_err(|e| anyhow!("error parsing --request-ratio: {e}"))?;

    let cpu_request_floor = Quantity(
        matches
            .get_one::<String>("cpu-request-floor")
            .expect("clap should have set a default value")
            .to_owned(),
    );
    let cpu_request_floor_millis = quantity::cpu_millis(&cpu_request_floor)
        .map_err(|e| anyhow!("error parsing --cpu-request-floor: {e}"))?;

    let memory_request_floor = Quantity(
        matches
            .get_one::<String>("memory-request-floor")
            .expect("clap should have set a default value")
            .to_owned(),
    );
    let memory_request_floor_bytes = quantity::memory_bytes(&memory_request_floor)
        .map_err(|e| anyhow!("error parsing --memory-request-floor: {e}"))?;

    let excluded_namespaces = matches
        .get_many::<String>("excluded-namespaces")
        .unwrap_or_default()
        .map(|namespace| namespace.trim())
        .filter(|namespace| !namespace.is_empty())
        .map(str::to_owned)
        .collect();

    Ok(MutationPolicy {
        request_ratio,
        cpu_request_floor_millis,
        memory_request_floor_bytes,
        excluded_namespaces,
    })
}

fn endpoints(matches: &clap::ArgMatches) -> Result<BTreeSet<Endpoint>> {
    let endpoints = matches
        .get_many::<String>("endpoints")
        .unwrap_or_default()
        .map(|name| name.parse::<Endpoint>().map_err(|e| anyhow!(e)))
        .collect::<Result<BTreeSet<_>>>()?;

    if endpoints.is_empty() {
        return Err(anyhow!("error parsing arguments: at least one endpoint must be enabled"));
    }

    Ok(endpoints)
}
