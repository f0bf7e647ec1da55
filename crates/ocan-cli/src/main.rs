// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "ocanctl", version, about = "Inspect and drive a running OCAN daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the daemon, e.g. http://127.0.0.1:8787.
    #[arg(long, default_value = "http://127.0.0.1:8787")]
    url: String,

    /// Print raw JSON instead of a formatted summary.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the daemon is up and report its protocol version.
    Health,

    /// List the tools currently registered with the daemon.
    Tools,

    /// Invoke a registered tool with JSON arguments.
    Call {
        /// Tool name.
        name: String,

        /// Tool arguments as a JSON object. Defaults to `{}`.
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let body: Value = client
                .get(format!("{}/health", cli.url))
                .send()
                .await
                .context("GET /health")?
                .error_for_status()
                .context("daemon returned an error status")?
                .json()
                .await
                .context("decode /health response")?;
            print_result(&body, cli.json);
        }
        Commands::Tools => {
            let result = rpc_call(&client, &cli.url, "tools/list", Value::Null).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for tool in result["tools"].as_array().cloned().unwrap_or_default() {
                    println!(
                        "{}\t{}",
                        tool["name"].as_str().unwrap_or("?"),
                        tool["description"].as_str().unwrap_or("")
                    );
                }
            }
        }
        Commands::Call { name, args } => {
            let args: Value = serde_json::from_str(&args).context("--args must be valid JSON")?;
            let result = rpc_call(&client, &cli.url, "tools/call", json!({"name": name, "arguments": args})).await?;
            print_result(&result, cli.json);
        }
    }

    Ok(())
}

/// Send a single one-shot JSON-RPC request to the daemon's `/rpc` endpoint.
async fn rpc_call(client: &reqwest::Client, base_url: &str, method: &str, params: Value) -> Result<Value> {
    let request = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
    let response: Value = client
        .post(format!("{base_url}/rpc"))
        .json(&request)
        .send()
        .await
        .with_context(|| format!("POST /rpc ({method})"))?
        .error_for_status()
        .context("daemon returned an error status")?
        .json()
        .await
        .context("decode /rpc response")?;

    if let Some(error) = response.get("error") {
        bail!("{method} failed: {error}");
    }
    Ok(response.get("result").cloned().unwrap_or(Value::Null))
}

fn print_result(value: &Value, as_json: bool) {
    if as_json {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    } else if let Some(object) = value.as_object() {
        for (key, val) in object {
            println!("{key}: {val}");
        }
    } else {
        println!("{value}");
    }
}
