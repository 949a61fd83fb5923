use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powchain-cli")]
#[command(about = "CLI client for the powchain node admin API")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct Target {
    /// Node base URL (e.g. http://127.0.0.1:3001)
    #[arg(long, default_value = "http://127.0.0.1:3001")]
    node: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the node's chain
    Blocks {
        #[command(flatten)]
        target: Target,
    },
    /// Mine a block carrying the given data
    Mine {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        data: String,
    },
    /// Check the chain backwards from a block index
    Validate {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        index: u64,
    },
    /// List connected peers
    Peers {
        #[command(flatten)]
        target: Target,
    },
    /// Ask the node to dial a peer, e.g. ws://127.0.0.1:6002
    AddPeer {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        peer: String,
    },
}

#[derive(Serialize)]
struct MineBody {
    data: String,
}

#[derive(Serialize)]
struct AddPeerBody {
    peer: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let req = match cli.cmd {
        Command::Blocks { target } => client.get(format!("{}/blocks", target.node)),
        Command::Mine { target, data } => client
            .post(format!("{}/mineBlock", target.node))
            .json(&MineBody { data }),
        Command::Validate { target, index } => client
            .get(format!("{}/validate", target.node))
            .query(&[("index", index)]),
        Command::Peers { target } => client.get(format!("{}/peers", target.node)),
        Command::AddPeer { target, peer } => client
            .post(format!("{}/addPeer", target.node))
            .json(&AddPeerBody { peer }),
    };
    debug!(?req, "sending request");

    let res = req.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
