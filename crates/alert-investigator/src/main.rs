//! Alert investigator CLI
//!
//! Lists firing Grafana alerts with their rule query and threshold, and asks
//! the Grafana LLM app to classify an alert on demand.

#![allow(clippy::disallowed_macros)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alert_investigator::config::{DEFAULT_GRAFANA_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use alert_investigator::{
    build_prompt, ui, Dashboard, GrafanaClient, GrafanaConfig, InvestigationResult, Investigator,
};

/// Investigate firing Grafana alerts with the Grafana LLM app
#[derive(Parser)]
#[command(name = "alert-investigator")]
#[command(about = "Investigate firing Grafana alerts with the Grafana LLM app")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Grafana base URL
    #[arg(long, env = "GRAFANA_URL", default_value = DEFAULT_GRAFANA_URL, global = true)]
    grafana_url: String,

    /// Service account token
    #[arg(long, env = "GRAFANA_API_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Model identifier passed to the LLM app
    #[arg(long, env = "GRAFANA_LLM_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Request timeout in seconds
    #[arg(long, env = "GRAFANA_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,

    /// Output format (json or text)
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    #[default]
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// List firing alerts with their rule query and threshold
    Alerts,
    /// Investigate the alert at the given row
    Investigate {
        /// Row number from `alerts`
        index: usize,
    },
    /// Investigate every firing alert, one at a time
    InvestigateAll,
    /// Print the prompt that would be sent for an alert
    Prompt {
        /// Row number from `alerts`
        index: usize,
    },
}

#[derive(Serialize)]
struct InvestigationOutput<'a> {
    index: usize,
    alert: &'a str,
    result: &'a InvestigationResult,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = GrafanaConfig::new(cli.grafana_url)
        .with_timeout_secs(cli.timeout_secs)
        .with_model(cli.model);
    if let Some(token) = cli.token.filter(|t| !t.is_empty()) {
        config = config.with_token(token);
    }

    let client = Arc::new(GrafanaClient::new(config).context("Failed to create Grafana client")?);
    let dashboard = Dashboard::new(client.clone(), Investigator::new(client));

    load(&dashboard).await?;

    match cli.command {
        Commands::Alerts => run_alerts(&dashboard, cli.format).await,
        Commands::Investigate { index } => run_investigate(&dashboard, &[index], cli.format).await,
        Commands::InvestigateAll => {
            let count = dashboard.rows().await.len();
            let indices: Vec<usize> = (0..count).collect();
            run_investigate(&dashboard, &indices, cli.format).await
        }
        Commands::Prompt { index } => run_prompt(&dashboard, index).await,
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("alert_investigator=debug,info")
        } else {
            EnvFilter::new("alert_investigator=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn load(dashboard: &Dashboard) -> Result<()> {
    dashboard.refresh().await;
    let state = dashboard.snapshot().await;
    if let Some(err) = state.last_error() {
        bail!("Failed to load alerts from Grafana: {err}");
    }
    Ok(())
}

async fn run_alerts(dashboard: &Dashboard, format: OutputFormat) -> Result<()> {
    let rows = dashboard.rows().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => println!("{}", ui::render_alerts(&rows, None)),
    }
    Ok(())
}

async fn run_investigate(dashboard: &Dashboard, indices: &[usize], format: OutputFormat) -> Result<()> {
    let rows = dashboard.rows().await;
    if rows.is_empty() && format == OutputFormat::Text {
        println!("{}", ui::NO_ACTIVE_ALERTS);
    }

    let mut outputs = Vec::with_capacity(indices.len());
    for &index in indices {
        let row = rows
            .get(index)
            .with_context(|| format!("No active alert at index {index} ({} loaded)", rows.len()))?;

        if format == OutputFormat::Text {
            eprintln!("{} {}", "Thinking...".dimmed(), row.display_name);
        }

        let result = dashboard
            .investigate(index)
            .await
            .with_context(|| format!("Failed to investigate {}", row.display_name))?;

        match format {
            OutputFormat::Text => println!("{}\n", ui::render_result(&row.display_name, &result)),
            OutputFormat::Json => outputs.push((index, row.display_name.clone(), result)),
        }
    }

    if format == OutputFormat::Json {
        let items: Vec<InvestigationOutput<'_>> = outputs
            .iter()
            .map(|(index, alert, result)| InvestigationOutput {
                index: *index,
                alert,
                result,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    }

    Ok(())
}

async fn run_prompt(dashboard: &Dashboard, index: usize) -> Result<()> {
    let state = dashboard.snapshot().await;
    let alert = state.alerts().get(index).with_context(|| {
        format!(
            "No active alert at index {index} ({} loaded)",
            state.alerts().len()
        )
    })?;
    println!("{}", build_prompt(alert, state.rules()));
    Ok(())
}
