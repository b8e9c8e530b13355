use std::error::Error;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for the circuit-guard admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "CIRCUIT_GUARD_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check daemon status
    Status,
    /// Show every circuit breaker with its stats
    Breakers,
    /// Show healthy/unhealthy partition
    Health,
    /// Reset one breaker, or all of them when no service is given
    Reset {
        /// Service name to reset
        service: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Status => client.get(endpoint(&cli.url, &["admin", "status"])?),
        Commands::Breakers => client.get(endpoint(&cli.url, &["admin", "breakers"])?),
        Commands::Health => client.get(endpoint(&cli.url, &["admin", "health"])?),
        Commands::Reset { service: Some(name) } => {
            client.post(endpoint(&cli.url, &["admin", "breakers", name.as_str(), "reset"])?)
        }
        Commands::Reset { service: None } => {
            client.post(endpoint(&cli.url, &["admin", "breakers", "reset"])?)
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

/// Join path segments onto the admin base URL, percent-encoding each one.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, Box<dyn Error>> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| format!("admin URL cannot take a path: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn Error>> {
    let status = res.status();
    let text = res.text().await?;

    if status.is_success() {
        let json: Value = serde_json::from_str(&text)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    // /admin/health answers 503 with a full report when degraded.
    if status == StatusCode::SERVICE_UNAVAILABLE {
        if let Ok(json) = serde_json::from_str::<Value>(&text) {
            println!("{}", serde_json::to_string_pretty(&json)?);
            return Err("one or more circuit breakers are not closed".into());
        }
    }

    if !text.is_empty() {
        eprintln!("Response: {}", text);
    }
    Err(format!("admin API returned status {}", status).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_service_names() {
        let url = endpoint("http://localhost:8081", &["admin", "breakers", "email/eu west", "reset"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8081/admin/breakers/email%2Feu%20west/reset");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = endpoint("http://guard.internal/ops/", &["admin", "status"]).unwrap();
        assert_eq!(url.as_str(), "http://guard.internal/ops/admin/status");
    }
}
