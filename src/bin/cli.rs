//! Pandemic Dashboard CLI
//!
//! Command-line client for a running dashboard server:
//! - List countries
//! - Print KPIs for a country and date range
//! - Export filtered rows as CSV
//! - Generate a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pandemic-dashboard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query a running pandemic dashboard server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Dashboard server URL
    #[arg(long, default_value = "http://localhost:8501", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List selectable countries
    Countries,

    /// Show KPIs for a country
    Summary {
        /// Country name, exactly as listed by `countries`
        country: String,
        /// Start date (YYYY-MM-DD, default: first available)
        #[arg(short, long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD, default: last available)
        #[arg(short, long)]
        end: Option<String>,
    },

    /// Export a country's rows as CSV
    Export {
        /// Country name
        country: String,
        #[arg(short, long)]
        start: Option<String>,
        #[arg(short, long)]
        end: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Countries => {
            let data = get_json(&client, &format!("{}/api/v1/countries", cli.api_url)).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                let countries = data["countries"].as_array().cloned().unwrap_or_default();
                for country in &countries {
                    println!("{}", country.as_str().unwrap_or("-"));
                }
                println!();
                println!("{} countries", countries.len());
            }
        }

        Commands::Summary {
            country,
            start,
            end,
        } => {
            let url = selection_url(
                &cli.api_url,
                "dashboard",
                &country,
                start.as_deref(),
                end.as_deref(),
            );
            let view = get_json(&client, &url).await?;

            if cli.format == "json" {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "country": view["country"],
                        "range": view["range"],
                        "row_count": view["row_count"],
                        "kpis": view["kpis"],
                    }))?
                );
            } else {
                let range = match (view["range"]["start"].as_str(), view["range"]["end"].as_str()) {
                    (Some(s), Some(e)) => format!("{} to {}", s, e),
                    _ => "no data".to_string(),
                };

                println!("{}", view["country"].as_str().unwrap_or(&country));
                println!("{} ({} rows)", range, view["row_count"].as_u64().unwrap_or(0));
                println!("{}", "-".repeat(40));
                println!(
                    "{:<20} {:>19}",
                    "Total New Cases",
                    view["display"]["total_new_cases"].as_str().unwrap_or("-")
                );
                println!(
                    "{:<20} {:>19}",
                    "Max Total Deaths",
                    view["display"]["max_total_deaths"].as_str().unwrap_or("-")
                );
                println!(
                    "{:<20} {:>19}",
                    "% Vaccinated",
                    view["display"]["vaccination_ratio"].as_str().unwrap_or("-")
                );
            }
        }

        Commands::Export {
            country,
            start,
            end,
            output,
        } => {
            let url = format!(
                "{}&format=csv",
                selection_url(&cli.api_url, "series", &country, start.as_deref(), end.as_deref())
            );

            let response = client.get(&url).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Export failed ({}): {}", status, text);
                std::process::exit(1);
            }

            let data = response.text().await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &data)?;
                    println!("Exported to {:?}", path);
                }
                None => {
                    print!("{}", data);
                }
            }
        }

        Commands::Status => {
            let response = client
                .get(format!("{}/health", cli.api_url))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    println!("Pandemic Dashboard v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("Status:    {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("Warehouse: {}", health["backend"].as_str().unwrap_or("unknown"));
                    println!(
                        "Cache:     {} entries, {} hits, {} misses",
                        health["cache"]["entries"].as_u64().unwrap_or(0),
                        health["cache"]["hits"].as_u64().unwrap_or(0),
                        health["cache"]["misses"].as_u64().unwrap_or(0)
                    );

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!("Uptime:    {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("Server returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to dashboard at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the server is running:");
                    eprintln!("  cargo run --bin pandemic-dashboard");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { output } => {
            let config = pandemic_dashboard::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

async fn get_json(
    client: &reqwest::Client,
    url: &str,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        eprintln!("Request failed ({}): {}", status, text);
        std::process::exit(1);
    }

    Ok(response.json().await?)
}

fn selection_url(
    base: &str,
    endpoint: &str,
    country: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> String {
    let mut url = format!(
        "{}/api/v1/{}?country={}",
        base,
        endpoint,
        urlencoding::encode(country)
    );
    if let Some(start) = start {
        url.push_str(&format!("&start={}", urlencoding::encode(start)));
    }
    if let Some(end) = end {
        url.push_str(&format!("&end={}", urlencoding::encode(end)));
    }
    url
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
