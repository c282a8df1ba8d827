use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::Parser;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use dualcast::config::{Config, ContentStoreConfig};
use dualcast::domains::envelope::{ContentId, Envelope};
use dualcast::error::{DualcastError, Result};
use dualcast::interfaces::content_store::ContentStore;
use dualcast::providers::ipfs::IpfsContentStore;
use dualcast::services::daemon_client::DaemonClient;
use dualcast::services::gateway::GatewayResolver;

#[derive(Parser, Debug)]
#[command(name = "dualcast")]
#[command(about = "Client for the dualcast delivery daemon")]
struct Cli {
    #[arg(long, env = "DUALCAST_DAEMON", default_value = "http://127.0.0.1:7878")]
    daemon: String,

    #[arg(long, default_value_t = 30)]
    timeout_seconds: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    Status,
    ContentStatus,
    Deliver {
        #[arg(long)]
        to: String,

        #[arg(long)]
        payload: String,

        #[arg(long, default_value_t = false, help = "Payload is already base64")]
        base64: bool,

        #[arg(long, default_value = "dual")]
        mode: String,

        #[arg(long)]
        sender: Option<String>,
    },
    Fetch {
        cid: String,

        #[arg(long, env = "DUALCAST_CONFIG")]
        config: Option<String>,

        #[arg(long, env = "DUALCAST_IPFS_API")]
        ipfs_api: Option<String>,
    },
    Gateway {
        cid: String,

        #[arg(long = "gateway")]
        gateways: Vec<String>,
    },
}

fn print_json(value: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

async fn print_daemon_get(client: &DaemonClient, path: &str) -> Result<()> {
    let response = client.get_json(path).await?;
    print_json(&response.body);
    Ok(())
}

fn store_config(config: Option<String>, ipfs_api: Option<String>) -> Result<ContentStoreConfig> {
    let from_file = match config {
        Some(path) => Config::from_file(path)?.content_store,
        None => None,
    };
    match (ipfs_api, from_file) {
        (Some(api_url), Some(mut store)) => {
            store.api_url = api_url;
            Ok(store)
        }
        (Some(api_url), None) => Ok(ContentStoreConfig::new(api_url)),
        (None, Some(store)) => Ok(store),
        (None, None) => Err(DualcastError::Config(
            "no content store configured; pass --ipfs-api or --config".to_string(),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dualcast=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let client = DaemonClient::new(cli.daemon.clone(), Duration::from_secs(cli.timeout_seconds))?;

    match cli.command {
        Commands::Status => print_daemon_get(&client, "/transport_status").await,
        Commands::ContentStatus => print_daemon_get(&client, "/content_status").await,
        Commands::Deliver {
            to,
            payload,
            base64,
            mode,
            sender,
        } => {
            let payload = if base64 {
                payload
            } else {
                BASE64.encode(payload.as_bytes())
            };
            let body = json!({
                "recipient_id": to,
                "payload": payload,
                "mode": mode,
                "sender_id": sender,
            });
            let response = client.post_json("/deliver", &body).await?;
            print_json(&response.body);
            if response.status.is_success() {
                Ok(())
            } else {
                Err(DualcastError::Http(format!(
                    "daemon responded with {}",
                    response.status
                )))
            }
        }
        Commands::Fetch {
            cid,
            config,
            ipfs_api,
        } => {
            let store = IpfsContentStore::new(&store_config(config, ipfs_api)?)?;
            let bytes = store.fetch(&ContentId::new(cid)).await?;
            match Envelope::from_bytes(&bytes) {
                Ok(envelope) => {
                    let decoded = BASE64
                        .decode(envelope.payload.as_bytes())
                        .map(|raw| String::from_utf8_lossy(&raw).to_string())
                        .unwrap_or_default();
                    print_json(&json!({"envelope": envelope, "decoded_payload": decoded}));
                }
                Err(_) => println!("{}", String::from_utf8_lossy(&bytes)),
            }
            Ok(())
        }
        Commands::Gateway { cid, gateways } => {
            let bases = if gateways.is_empty() {
                ContentStoreConfig::new("").gateways()
            } else {
                gateways
            };
            for url in GatewayResolver::new(bases).urls(&ContentId::new(cid)) {
                println!("{url}");
            }
            Ok(())
        }
    }
}
