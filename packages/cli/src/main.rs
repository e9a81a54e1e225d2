#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tool for maintaining and inspecting Khoj area statistics.
//!
//! ```text
//! khoj recompute --district Dhaka --upazila Mirpur
//! khoj recompute --all
//! khoj seed-breakdown
//! khoj area Dhaka Mirpur
//! khoj district Dhaka
//! khoj dangerous [--limit 10]
//! khoj overall
//! khoj trends [--district Dhaka] [--upazila Mirpur] [--months 6]
//! khoj serve [--bind-addr 0.0.0.0] [--port 8080]
//! ```
//!
//! Running `khoj` with no subcommand enters interactive mode. Every command
//! accepts `--database` to override `DATABASE_PATH`.
//!
//! Uses `indicatif-log-bridge` (via [`khoj_cli_utils::init_logger`]) so
//! that log lines and progress bars never fight for the terminal.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use khoj_incident_models::AreaKey;
use khoj_server::config::ServerConfig;

#[derive(Parser)]
#[command(name = "khoj", about = "Maintain and inspect Khoj area danger statistics")]
struct Cli {
    /// `SQLite` database file (defaults to `DATABASE_PATH`, then data/khoj.db)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute one area, or every area with alerts or reports
    Recompute {
        /// District of the area to recompute
        #[arg(long, required_unless_present = "all")]
        district: Option<String>,
        /// Upazila of the area to recompute
        #[arg(long, required_unless_present = "all")]
        upazila: Option<String>,
        /// Recompute every area with activity
        #[arg(long, conflicts_with_all = ["district", "upazila"])]
        all: bool,
    },
    /// Rewrite the incident-category counters from current totals
    SeedBreakdown,
    /// Show one area's statistics
    Area {
        /// District name
        district: String,
        /// Upazila name
        upazila: String,
    },
    /// Show a district's areas and summed figures
    District {
        /// District name
        district: String,
    },
    /// List high and critical areas
    Dangerous {
        /// Maximum number of areas to show
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show platform-wide totals and level distribution
    Overall,
    /// Show merged monthly trends
    Trends {
        /// Restrict to one district
        #[arg(long)]
        district: Option<String>,
        /// Restrict to one upazila
        #[arg(long)]
        upazila: Option<String>,
        /// Newest entries taken per area
        #[arg(long)]
        months: Option<usize>,
    },
    /// Start the API server
    Serve {
        /// Address to bind (defaults to `BIND_ADDR`)
        #[arg(long)]
        bind_addr: Option<String>,
        /// Port to listen on (defaults to `PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = khoj_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env();
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let Some(command) = cli.command else {
        return interactive::run(config, &multi).await;
    };

    match command {
        Commands::Recompute {
            district,
            upazila,
            all,
        } => {
            let db = commands::open_db(&config).await?;
            if all {
                commands::recompute_all(db.as_ref(), &multi).await?;
            } else {
                let area = AreaKey::from_parts(district.as_deref(), upazila.as_deref())?;
                commands::recompute_area(db.as_ref(), &area).await?;
            }
        }
        Commands::SeedBreakdown => {
            let db = commands::open_db(&config).await?;
            commands::seed_breakdown(db.as_ref()).await?;
        }
        Commands::Area { district, upazila } => {
            let area = AreaKey::new(&district, &upazila)?;
            let db = commands::open_db(&config).await?;
            commands::show_area(db.as_ref(), &area).await?;
        }
        Commands::District { district } => {
            let db = commands::open_db(&config).await?;
            commands::show_district(db.as_ref(), &district).await?;
        }
        Commands::Dangerous { limit } => {
            let db = commands::open_db(&config).await?;
            commands::show_dangerous(db.as_ref(), limit).await?;
        }
        Commands::Overall => {
            let db = commands::open_db(&config).await?;
            commands::show_overall(db.as_ref()).await?;
        }
        Commands::Trends {
            district,
            upazila,
            months,
        } => {
            let db = commands::open_db(&config).await?;
            commands::show_trends(db.as_ref(), district.as_deref(), upazila.as_deref(), months)
                .await?;
        }
        Commands::Serve { bind_addr, port } => {
            if let Some(bind_addr) = bind_addr {
                config.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.port = port;
            }
            commands::serve(config).await?;
        }
    }

    Ok(())
}
