use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use u_roster::config::PlanConfig;
use u_roster::cp::SolverConfig;
use u_roster::models::Schedule;
use u_roster::planner::{Planner, Strategy};
use u_roster::scheduler::{Absence, CoverPolicy, EmergencyCover, LeastLoaded, SeededRandom};

#[derive(Parser)]
#[command(name = "u-roster", about = "Monthly shift rostering", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a schedule from a plan file (TOML or JSON) and print it as JSON
    Plan {
        /// Plan configuration file
        config: PathBuf,
        /// Use the greedy assigner instead of the exact solver
        #[arg(long)]
        greedy: bool,
        /// Tie-break seed of the exact solver
        #[arg(long)]
        seed: Option<u64>,
        /// Search node limit of the exact solver
        #[arg(long)]
        node_limit: Option<u64>,
        /// Wall-clock limit of the exact solver, in seconds
        #[arg(long)]
        time_limit: Option<f64>,
        /// Write the output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace absent workers in a published schedule
    Cover {
        /// Plan configuration file the schedule was built from
        config: PathBuf,
        /// Published schedule (JSON, as printed by `plan`)
        schedule: PathBuf,
        /// Absence as WORKER@YYYY-MM-DD; repeatable
        #[arg(short, long = "absent", required = true)]
        absences: Vec<String>,
        /// Pick replacements at random with this seed instead of least-loaded
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("u_roster=info".parse()?))
        .init();

    match Cli::parse().command {
        Commands::Plan {
            config,
            greedy,
            seed,
            node_limit,
            time_limit,
            output,
        } => {
            let plan = PlanConfig::load(&config)?;
            let roster = plan.to_roster()?;
            let strategy = match plan.strategy()? {
                _ if greedy => Strategy::Greedy,
                Strategy::Exact(solver) => {
                    Strategy::Exact(override_limits(solver, seed, node_limit, time_limit)?)
                }
                Strategy::Greedy => Strategy::Greedy,
            };
            let outcome = Planner::new(&roster)
                .with_strategy(strategy)
                .with_objective(plan.objective()?)
                .plan()?;
            for warning in &outcome.warnings {
                warn!(%warning, "plan warning");
            }

            let text = serde_json::to_string_pretty(&outcome)?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{text}"),
            }
        }
        Commands::Cover {
            config,
            schedule,
            absences,
            seed,
        } => {
            let roster = PlanConfig::load(&config)?.to_roster()?;
            let text = std::fs::read_to_string(&schedule)
                .with_context(|| format!("failed to read {}", schedule.display()))?;
            let published = read_schedule(&text)?;
            let absences = absences
                .iter()
                .map(|a| parse_absence(a))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let mut policy: Box<dyn CoverPolicy> = match seed {
                Some(seed) => Box::new(SeededRandom::new(seed)),
                None => Box::new(LeastLoaded),
            };
            let (repaired, outcomes) =
                EmergencyCover::new(&roster).apply(&published, &absences, policy.as_mut());
            let uncovered = outcomes.iter().filter(|o| o.is_uncovered()).count();
            if uncovered > 0 {
                warn!(uncovered, "shifts left uncovered");
            }
            let out = json!({ "schedule": repaired, "outcomes": outcomes });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn override_limits(
    mut solver: SolverConfig,
    seed: Option<u64>,
    node_limit: Option<u64>,
    time_limit: Option<f64>,
) -> anyhow::Result<SolverConfig> {
    if let Some(seed) = seed {
        solver.seed = seed;
    }
    if let Some(nodes) = node_limit {
        solver.node_limit = Some(nodes);
    }
    if let Some(secs) = time_limit {
        if !secs.is_finite() || secs < 0.0 {
            bail!("invalid time limit: {secs}");
        }
        solver.time_limit = Some(Duration::from_secs_f64(secs));
    }
    Ok(solver)
}

/// Accepts a bare schedule or a full `plan` output.
fn read_schedule(text: &str) -> anyhow::Result<Schedule> {
    let value: serde_json::Value =
        serde_json::from_str(text).context("schedule is not valid JSON")?;
    let value = match value.get("schedule") {
        Some(inner) => inner.clone(),
        None => value,
    };
    serde_json::from_value(value).context("schedule has an unexpected shape")
}

fn parse_absence(text: &str) -> anyhow::Result<Absence> {
    let Some((worker, date)) = text.rsplit_once('@') else {
        bail!("absence '{text}' is not WORKER@YYYY-MM-DD");
    };
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("invalid date in absence '{text}'"))?;
    Ok(Absence::new(worker, date))
}
