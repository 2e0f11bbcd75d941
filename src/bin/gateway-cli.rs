use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command line client for the Substrate node gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the gateway itself is up
    Ping,
    /// Check a node answers through the gateway
    PingNode {
        #[arg(short, long)]
        websocket: String,
    },
    /// List the nodes the gateway is connected to
    Connections,
    /// Call a method, e.g. `call query staking/erasStakers --param account_id=...`
    Call {
        /// rpc, query, custom or derive
        namespace: String,
        /// `section/method`, or just the method name for `custom`
        method: String,
        #[arg(short, long)]
        websocket: String,
        /// Query-string parameter as key=value; repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Ping => client.get(format!("{base}/api/pingApi")),
        Commands::PingNode { websocket } => client
            .get(format!("{base}/api/pingNode"))
            .query(&[("websocket", websocket)]),
        Commands::Connections => client.get(format!("{base}/api/getConnectionsList")),
        Commands::Call { namespace, method, websocket, params } => client
            .get(format!("{base}/api/{namespace}/{method}"))
            .query(&[("websocket", websocket)])
            .query(&params),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{body}");
    } else {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("{body}");
        std::process::exit(1);
    }
    Ok(())
}
