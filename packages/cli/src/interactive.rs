//! Interactive mode: pick a task from a menu.

use dialoguer::{Input, Select};
use khoj_cli_utils::MultiProgress;
use khoj_incident_models::AreaKey;
use khoj_server::config::ServerConfig;

use crate::commands;

enum Task {
    RecomputeAll,
    RecomputeArea,
    SeedBreakdown,
    Dangerous,
    Overall,
    Server,
}

impl Task {
    const ALL: &[Self] = &[
        Self::RecomputeAll,
        Self::RecomputeArea,
        Self::SeedBreakdown,
        Self::Dangerous,
        Self::Overall,
        Self::Server,
    ];

    const fn label(&self) -> &'static str {
        match self {
            Self::RecomputeAll => "Recompute all areas",
            Self::RecomputeArea => "Recompute one area",
            Self::SeedBreakdown => "Seed incident breakdown",
            Self::Dangerous => "Show dangerous areas",
            Self::Overall => "Show overall statistics",
            Self::Server => "Start server",
        }
    }
}

fn prompt_area() -> Result<AreaKey, Box<dyn std::error::Error>> {
    let district: String = Input::new().with_prompt("District").interact_text()?;
    let upazila: String = Input::new().with_prompt("Upazila").interact_text()?;
    Ok(AreaKey::new(&district, &upazila)?)
}

/// Shows the task menu and runs the chosen task against `config`.
///
/// # Errors
///
/// Returns an error if a prompt fails or the chosen task fails.
pub async fn run(
    config: ServerConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Khoj Toolchain");
    println!("Database: {}", config.database_path.display());
    println!();

    let labels: Vec<&str> = Task::ALL.iter().map(Task::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Task::ALL[idx] {
        Task::RecomputeAll => {
            let db = commands::open_db(&config).await?;
            commands::recompute_all(db.as_ref(), multi).await
        }
        Task::RecomputeArea => {
            let area = prompt_area()?;
            let db = commands::open_db(&config).await?;
            commands::recompute_area(db.as_ref(), &area).await
        }
        Task::SeedBreakdown => {
            let db = commands::open_db(&config).await?;
            commands::seed_breakdown(db.as_ref()).await
        }
        Task::Dangerous => {
            let db = commands::open_db(&config).await?;
            commands::show_dangerous(db.as_ref(), None).await
        }
        Task::Overall => {
            let db = commands::open_db(&config).await?;
            commands::show_overall(db.as_ref()).await
        }
        Task::Server => commands::serve(config).await,
    }
}
