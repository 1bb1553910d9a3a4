use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operations CLI for the content gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Client identity sent as x-client-id (affects rate limiting).
    #[arg(short, long)]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// Inspect circuit breakers and rate limit configuration
    Status,
    /// Run a one-off generation through the failover pipeline
    Generate {
        /// Prompt to send
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let client_id = cli.client_id.clone();
    let with_identity = move |req: reqwest::RequestBuilder| match &client_id {
        Some(id) => req.header("x-client-id", id),
        None => req,
    };

    match cli.command {
        Commands::Health => {
            let res = with_identity(client.get(format!("{}/health", cli.url)))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = with_identity(client.get(format!("{}/api/status", cli.url)))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Generate { prompt } => {
            let res = with_identity(client.post(format!("{}/api/content/generate", cli.url)))
                .json(&serde_json::json!({ "prompt": prompt }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Some(retry_after) = res.headers().get("retry-after") {
            eprintln!("Retry-After: {}", retry_after.to_str().unwrap_or("?"));
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
