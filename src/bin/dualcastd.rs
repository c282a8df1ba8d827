use std::sync::Arc;

use clap::Parser;
use dualcast::config::{Config, ContentStoreConfig};
use dualcast::daemon;
use dualcast::error::Result;
use dualcast::interfaces::content_store::ContentStore;
use dualcast::providers::memory::MemoryContentStore;
use dualcast::DualcastNode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dualcastd")]
#[command(about = "Dual-transport message delivery daemon")]
struct Cli {
    #[arg(long, env = "DUALCAST_CONFIG")]
    config: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long, env = "DUALCAST_IPFS_API")]
    ipfs_api: Option<String>,

    #[arg(
        long,
        default_value_t = false,
        help = "Use an in-process content store instead of an IPFS daemon"
    )]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dualcast=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(api_url) = cli.ipfs_api {
        match config.content_store.as_mut() {
            Some(store) => store.api_url = api_url,
            None => config.content_store = Some(ContentStoreConfig::new(api_url)),
        }
    }
    let server = config.server.get_or_insert_with(Default::default);
    if let Some(host) = cli.host {
        server.host = Some(host);
    }
    if let Some(port) = cli.port {
        server.port = Some(port);
    }

    let node = if cli.memory_store {
        let store: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
        DualcastNode::with_content_store(config, Some(store))
    } else {
        DualcastNode::from_config(config)
    };
    let host = node.config().host();
    let port = node.config().port();
    daemon::run_with_shutdown(node, &host, port, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
    })
    .await
}
