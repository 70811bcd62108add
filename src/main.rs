use anyhow::Context;
use clap::Parser;
use sparql_resolver::{AppConfig, HttpServer, HttpSparqlClient, ResourceResolver};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "sparql-resolver", version, about = "Serve Linked-Data resources from a SPARQL endpoint")]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "SPARQL_RESOLVER_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    address: Option<String>,

    /// Port
    #[arg(long)]
    port: Option<u16>,

    /// SPARQL endpoint, absolute or relative to the base IRI
    #[arg(long, env = "SPARQL_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Public base IRI of the served resources
    #[arg(long)]
    base_iri: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(address) = self.address {
            config.server.address = address;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(base_iri) = self.base_iri {
            config.server.base_iri = Some(base_iri);
        }
        if let Some(endpoint_url) = self.endpoint_url {
            config.sparql.endpoint_url = endpoint_url;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = Cli::parse().into_config()?;
    let endpoint = config.endpoint()?;

    info!("sparql-resolver v{}", sparql_resolver::version());
    info!("SPARQL endpoint: {}", endpoint);

    let client = HttpSparqlClient::new(endpoint, Duration::from_secs(config.sparql.timeout_secs))?;
    let resolver = ResourceResolver::new(config.sparql, client);
    let server = HttpServer::new(config.server, resolver);

    server.start().await?;

    Ok(())
}
