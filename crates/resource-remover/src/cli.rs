use clap::builder::PossibleValue;
use clap::{crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, Command};
use itertools::Itertools;
use lazy_static::lazy_static;

use crate::mutation::Endpoint;

lazy_static! {
    static ref ALL_ENDPOINTS: String = Endpoint::ALL.iter().map(Endpoint::name).join(",");
}

pub fn build_cli() -> Command {
    let mut args = vec![
        Arg::new("log-level")
            .long("log-level")
            .value_name("LOG_LEVEL")
            .env("RESOURCE_REMOVER_LOG_LEVEL")
            .default_value("info")
            .value_parser([
                PossibleValue::new("trace"),
                PossibleValue::new("debug"),
                PossibleValue::new("info"),
                PossibleValue::new("warn"),
                PossibleValue::new("error"),
            ])
            .help("Log level"),
        Arg::new("log-fmt")
            .long("log-fmt")
            .value_name("LOG_FMT")
            .env("RESOURCE_REMOVER_LOG_FMT")
            .default_value("text")
            .value_parser([PossibleValue::new("text"), PossibleValue::new("json")])
            .help("Log output format"),
        Arg::new("log-no-color")
            .long("log-no-color")
            .env("NO_COLOR")
            .action(ArgAction::SetTrue)
            .help("Disable colored output for logs"),
        Arg::new("address")
            .long("addr")
            .value_name("BIND_ADDRESS")
            .default_value("0.0.0.0")
            .env("RESOURCE_REMOVER_BIND_ADDRESS")
            .help("Bind against ADDRESS"),
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .default_value("8443")
            .env("PORT")
            .help("Listen on PORT"),
        Arg::new("cert-file")
            .long("cert-file")
            .value_name("CERT_FILE")
            .default_value("/certs/tls.crt")
            .env("TLS_CERT_FILE")
            .help("Path to an X.509 certificate file for HTTPS"),
        Arg::new("key-file")
            .long("key-file")
            .value_name("KEY_FILE")
            .default_value("/certs/tls.key")
            .env("TLS_KEY_FILE")
            .help("Path to an X.509 private key file for HTTPS"),
        Arg::new("disable-tls")
            .long("disable-tls")
            .env("RESOURCE_REMOVER_DISABLE_TLS")
            .action(ArgAction::SetTrue)
            .help("Serve plain HTTP, for local runs behind a TLS terminator"),
        Arg::new("excluded-namespaces")
            .long("excluded-namespaces")
            .value_name("NAMESPACES")
            .env("RESOURCE_REMOVER_EXCLUDED_NAMESPACES")
            .default_value("kube-system")
            .value_delimiter(',')
            .help("Comma separated list of namespaces whose objects are never changed"),
        Arg::new("request-ratio")
            .long("request-ratio")
            .value_name("RATIO")
            .env("RESOURCE_REMOVER_REQUEST_RATIO")
            .default_value("0.2")
            .help("Fraction of the original cpu and memory requests to keep, as a decimal number or a fraction like 1/5. 0 removes the requests"),
        Arg::new("cpu-request-floor")
            .long("cpu-request-floor")
            .value_name("QUANTITY")
            .env("RESOURCE_REMOVER_CPU_REQUEST_FLOOR")
            .default_value("1m")
            .help("Scaled cpu requests are never set below this quantity"),
        Arg::new("memory-request-floor")
            .long("memory-request-floor")
            .value_name("QUANTITY")
            .env("RESOURCE_REMOVER_MEMORY_REQUEST_FLOOR")
            .default_value("1Mi")
            .help("Scaled memory requests are never set below this quantity"),
        Arg::new("endpoints")
            .long("endpoints")
            .value_name("ENDPOINTS")
            .env("RESOURCE_REMOVER_ENDPOINTS")
            .default_value(ALL_ENDPOINTS.as_str())
            .value_delimiter(',')
            .value_parser(
                Endpoint::ALL
                    .iter()
                    .map(|endpoint| PossibleValue::new(endpoint.name()))
                    .collect::<Vec<_>>(),
            )
            .help("Comma separated list of the mutation endpoints to serve"),
    ];
    args.sort_by(|a, b| a.get_id().cmp(b.get_id()));

    Command::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about(crate_description!())
        .args(args)
}
