//! Airspace Copilot CLI
//!
//! Tool commands (`snapshot`, `lookup`, `alerts`, `tools`, `serve`) only need
//! the snapshot endpoints. Agent commands (`ask`, `coordinate`) also need the
//! completion-service API key.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use airspace_copilot::agent_core::{
    ops_sitrep_question, traveler_question, AgentAnswer, AgentError, AgentLoop, AgentRole,
    LoopSettings, Orchestrator,
};
use airspace_copilot::config::{find_config_path, load_config, AppConfig};
use airspace_copilot::flight_data::{AlertResult, FlightSummary, HttpSnapshotFetcher};
use airspace_copilot::inference::InferenceClient;
use airspace_copilot::mcp::{self, McpServer};
use airspace_copilot::tools::{tool_definitions, AllowList, FlightTools, ToolRegistry};
use airspace_copilot::{init_tracing, LogOptions};

#[derive(Parser)]
#[command(name = "airspace-copilot")]
#[command(about = "Tool-calling agents over live regional flight snapshots", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: AIRSPACE_COPILOT_CONFIG, then airspace-copilot.yaml upwards from cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to the data directory instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every flight in a region's latest snapshot
    Snapshot {
        /// Region identifier (default from config)
        #[arg(long)]
        region: Option<String>,
    },
    /// Look up one flight by callsign
    Lookup {
        /// Flight callsign, e.g. PIA293
        callsign: String,
        #[arg(long)]
        region: Option<String>,
    },
    /// List flights that look anomalous
    Alerts {
        #[arg(long)]
        region: Option<String>,
    },
    /// Print the tool schemas offered to the model
    Tools,
    /// Serve the flight tools to MCP clients at http://<bind>/mcp
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
    /// Ask a single agent role
    Ask {
        #[command(subcommand)]
        role: AskCommand,
    },
    /// Ask Traveler and Ops, then merge both into one passenger answer
    Coordinate {
        callsign: String,
        question: String,
        #[arg(long)]
        region: Option<String>,
    },
}

#[derive(Subcommand)]
enum AskCommand {
    /// Passenger support for one flight
    Traveler {
        callsign: String,
        question: String,
        #[arg(long)]
        region: Option<String>,
    },
    /// Regional situation report (default question: a concise SITREP)
    Ops {
        question: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = init_tracing(LogOptions {
        to_file: cli.log_file,
        json: cli.log_json,
    })
    .context("failed to initialize logging")?;
    if let Some(path) = log_path {
        eprintln!("Logging to {}", path.display());
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_path = find_config_path(cli.config.as_deref(), &cwd);
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;

    let tools = flight_tools(&config)?;
    let default_region = config.regions.default_region.clone();
    let region_or_default = |r: Option<String>| r.unwrap_or_else(|| default_region.clone());

    match cli.command {
        Command::Snapshot { region } => {
            let snapshot = tools.region_snapshot(region.as_deref()).await?;
            if cli.json {
                return print_json(&snapshot);
            }
            println!(
                "Region {} | {} flights | snapshot_time {} | fetched {}",
                snapshot.region,
                snapshot.flight_count(),
                snapshot
                    .snapshot_time
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".into()),
                snapshot.fetched_at_iso
            );
            let rows: Vec<FlightSummary> =
                snapshot.flights().iter().map(FlightSummary::from).collect();
            print_flight_table(&rows);
        }
        Command::Lookup { callsign, region } => {
            let result = tools.lookup_callsign(&callsign, region.as_deref()).await?;
            if cli.json {
                return print_json(&result);
            }
            println!("{}", result.message);
            if let Some(flight) = &result.flight {
                print_flight_table(&[FlightSummary::from(flight)]);
            }
        }
        Command::Alerts { region } => {
            let result = tools.list_alerts(region.as_deref()).await?;
            if cli.json {
                return print_json(&result);
            }
            print_alert_table(&result);
        }
        Command::Tools => {
            return print_json(&tool_definitions(&default_region, &AllowList::All));
        }
        Command::Serve { bind } => {
            let server = McpServer::new(ToolRegistry::new(tools));
            mcp::serve(server, bind)
                .await
                .with_context(|| format!("MCP server on {bind} failed"))?;
        }
        Command::Ask { role } => {
            let agent = agent_loop(&config, tools)?;
            let (role, question) = match role {
                AskCommand::Traveler {
                    callsign,
                    question,
                    region,
                } => (
                    AgentRole::Traveler,
                    traveler_question(&callsign, &region_or_default(region), &question),
                ),
                AskCommand::Ops { question, region } => (
                    AgentRole::Ops,
                    question.unwrap_or_else(|| ops_sitrep_question(&region_or_default(region))),
                ),
            };
            let answer = role
                .ask(&agent, &question)
                .await
                .map_err(|e| agent_failure(e, &config))?;
            print_answer(role, &answer, cli.json)?;
        }
        Command::Coordinate {
            callsign,
            question,
            region,
        } => {
            let orchestrator = Orchestrator::new(agent_loop(&config, tools)?);
            let answer = orchestrator
                .traveler_with_ops(&callsign, &question, &region_or_default(region))
                .await
                .map_err(|e| agent_failure(e, &config))?;
            if cli.json {
                return print_json(&answer);
            }
            println!("── Traveler agent ──\n{}\n", answer.traveler_reply);
            println!("── Ops agent ──\n{}\n", answer.ops_reply);
            println!("── Final answer ──\n{}", answer.final_answer);
        }
    }

    Ok(())
}

fn flight_tools(config: &AppConfig) -> anyhow::Result<FlightTools> {
    let fetcher = HttpSnapshotFetcher::new(config.regions.clone())
        .context("failed to build snapshot fetcher")?;
    Ok(FlightTools::new(
        Arc::new(fetcher),
        config.regions.default_region.clone(),
    ))
}

fn agent_loop(config: &AppConfig, tools: FlightTools) -> anyhow::Result<AgentLoop> {
    let client = InferenceClient::from_config(config.model.clone())
        .context("failed to build completion client")?;
    Ok(AgentLoop::new(Arc::new(client), ToolRegistry::new(tools))
        .with_settings(LoopSettings::from(&config.agent)))
}

/// Add a credential hint when the completion service rejected the key.
fn agent_failure(err: AgentError, config: &AppConfig) -> anyhow::Error {
    let auth = matches!(&err, AgentError::Inference(e) if e.is_auth_error());
    let err = anyhow::Error::new(err);
    if auth {
        err.context(format!(
            "completion service refused the credentials; check {}",
            config.model.api_key_env
        ))
    } else {
        err
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct AnswerOutput<'a> {
    role: &'a str,
    answer: &'a str,
    completion_calls: usize,
    tool_outcomes: &'a [airspace_copilot::tools::ToolOutcome],
}

fn print_answer(role: AgentRole, answer: &AgentAnswer, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&AnswerOutput {
            role: role.name(),
            answer: &answer.content,
            completion_calls: answer.completion_calls,
            tool_outcomes: &answer.tool_outcomes,
        });
    }
    for outcome in &answer.tool_outcomes {
        let status = if outcome.success { "ok" } else { "error" };
        eprintln!(
            "  [{}] {} ({} ms)",
            status, outcome.tool_name, outcome.elapsed_ms
        );
    }
    println!("{}", answer.content);
    Ok(())
}

fn fmt_num(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.0}")).unwrap_or_else(|| "-".into())
}

fn print_flight_table(rows: &[FlightSummary]) {
    println!(
        "{:<9} {:<7} {:<22} {:>8} {:>7} {:>7} {:<6}",
        "CALLSIGN", "ICAO24", "COUNTRY", "ALT(m)", "SPD", "V/S", "GROUND"
    );
    for row in rows {
        println!(
            "{:<9} {:<7} {:<22} {:>8} {:>7} {:>7} {:<6}",
            if row.callsign.is_empty() { "-" } else { row.callsign.as_str() },
            row.icao24,
            row.country.as_deref().unwrap_or("-"),
            fmt_num(row.altitude_m),
            fmt_num(row.speed_mps),
            fmt_num(row.vertical_rate),
            match row.on_ground {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            }
        );
    }
}

fn print_alert_table(result: &AlertResult) {
    println!("Region {} | {} alerts", result.region, result.alert_count);
    if result.alerts.is_empty() {
        return;
    }
    println!(
        "{:<9} {:<7} {:<8} {:>8} {:>7} {:>7} REASON",
        "CALLSIGN", "ICAO24", "SEVERITY", "ALT(m)", "SPD", "V/S"
    );
    for alert in &result.alerts {
        let row = FlightSummary::from(&alert.flight);
        println!(
            "{:<9} {:<7} {:<8} {:>8} {:>7} {:>7} {}",
            if row.callsign.is_empty() { "-" } else { row.callsign.as_str() },
            row.icao24,
            alert.severity.to_string(),
            fmt_num(row.altitude_m),
            fmt_num(row.speed_mps),
            fmt_num(row.vertical_rate),
            alert.reason
        );
    }
}
