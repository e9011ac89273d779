use clap::{Parser, Subcommand};
use image_proxy::proxy::placeholder::is_placeholder;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use serde_json::json;

#[derive(Parser)]
#[command(name = "image-proxy-cli")]
#[command(about = "Probe a running image proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an image through the proxy and summarize the response
    Probe {
        /// Upstream image URL
        target: String,
    },
    /// Check the proxy health endpoint
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Probe { target } => {
            let res = client
                .get(format!("{}/api/image-proxy", cli.url))
                .query(&[("url", target.as_str())])
                .send()
                .await?;

            let status = res.status();
            let header = |name: reqwest::header::HeaderName| {
                res.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            let content_type = header(CONTENT_TYPE);
            let cache_control = header(CACHE_CONTROL);
            let request_id = header(reqwest::header::HeaderName::from_static("x-request-id"));

            let (bytes, placeholder, body_error) = match res.bytes().await {
                Ok(body) => (body.len(), is_placeholder(&body), None),
                Err(e) => (0, false, Some(e.to_string())),
            };

            let summary = json!({
                "status": status.as_u16(),
                "content_type": content_type,
                "cache_control": cache_control,
                "request_id": request_id,
                "bytes": bytes,
                "placeholder": placeholder,
                "body_error": body_error,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            if status.is_success() {
                println!("{}", text);
            } else {
                eprintln!("Error: health endpoint returned status {}", status);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
