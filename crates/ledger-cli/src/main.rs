use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        #[arg(long)]
        author: String,
        #[arg(long)]
        content: String,
    },
    /// Mine every pending transaction into a new block
    Mine,
    /// Print the full chain
    Chain,
    /// Print transactions waiting to be mined
    Pending,
    /// Ask the node to re-verify its chain
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    let req = match cli.cmd {
        Command::Submit { author, content } => client
            .post(format!("{node}/new_transaction"))
            .json(&json!({ "author": author, "content": content })),
        Command::Mine => client.get(format!("{node}/mine")),
        Command::Chain => client.get(format!("{node}/chain")),
        Command::Pending => client.get(format!("{node}/pending_tx")),
        Command::Validate => client.get(format!("{node}/validate")),
    };
    debug!(?req, "sending request");

    let res = req
        .send()
        .await
        .with_context(|| format!("could not reach node at {node}"))?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {status}");
    // Pretty-print JSON bodies, pass plain text through.
    match serde_json::from_str::<Value>(&body) {
        Ok(json) if json.is_object() || json.is_array() => {
            println!("{}", serde_json::to_string_pretty(&json)?)
        }
        _ => println!("{body}"),
    }
    Ok(())
}
