use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use mesh_control::client::ControlClient;
use mesh_control::control::{ConfigSnapshot, Route};

#[derive(Parser)]
#[command(name = "control-cli")]
#[command(about = "Management CLI for the mesh control plane", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9090")]
    url: String,

    /// Admin API key, sent as a Bearer token.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show control plane status
    Status,
    /// List registered proxies
    Proxies,
    /// Print the current config snapshot
    Config,
    /// Append a route and push the new snapshot
    AddRoute {
        path: String,
        backend: String,
        #[arg(long)]
        auth_required: bool,
        #[arg(long)]
        timeout_ms: Option<u32>,
    },
    /// Replace the route table from a TOML file of `[[routes]]`
    ReplaceRoutes { file: PathBuf },
    /// Push a snapshot to every subscriber (current one unless --file is given)
    Broadcast {
        /// JSON-encoded ConfigSnapshot.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove a proxy's registry entry
    RemoveProxy { proxy_id: String },
}

#[derive(Deserialize)]
struct RouteFile {
    routes: Vec<Route>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut client = ControlClient::new(&cli.url)?;
    if let Some(key) = cli.key {
        client = client.with_api_key(key);
    }

    match cli.command {
        Commands::Status => print_json(&client.status().await?)?,
        Commands::Proxies => print_json(&client.connected_proxies().await?)?,
        Commands::Config => print_json(&client.current_config().await?)?,
        Commands::AddRoute {
            path,
            backend,
            auth_required,
            timeout_ms,
        } => {
            let mut route = Route::new(path, backend).with_auth(auth_required);
            if let Some(timeout_ms) = timeout_ms {
                route = route.with_timeout_ms(timeout_ms);
            }
            print_json(&client.append_route(&route).await?)?;
        }
        Commands::ReplaceRoutes { file } => {
            let content = std::fs::read_to_string(&file)?;
            let parsed: RouteFile = toml::from_str(&content)?;
            print_json(&client.replace_routes(&parsed.routes).await?)?;
        }
        Commands::Broadcast { file } => {
            let snapshot = match file {
                Some(file) => {
                    let content = std::fs::read_to_string(&file)?;
                    Some(serde_json::from_str::<ConfigSnapshot>(&content)?)
                }
                None => None,
            };
            print_json(&client.broadcast(snapshot.as_ref()).await?)?;
        }
        Commands::RemoveProxy { proxy_id } => {
            if client.remove_proxy(&proxy_id).await? {
                println!("Removed {}", proxy_id);
            } else {
                eprintln!("Proxy {} is not registered", proxy_id);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
