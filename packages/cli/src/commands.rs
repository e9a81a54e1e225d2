//! Implementations shared by the subcommands and interactive mode.

use std::sync::Arc;

use chrono::Utc;
use khoj_cli_utils::{IndicatifProgress, MultiProgress};
use khoj_incident_models::AreaKey;
use khoj_server::config::ServerConfig;
use khoj_statistics::{bulk, engine, reads};
use khoj_statistics_models::AreaStatistics;
use serde::Serialize;
use switchy_database::Database;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Formats areas as a fixed-width table, most dangerous first.
pub fn format_area_table(areas: &[AreaStatistics]) -> String {
    let mut out = format!(
        "{:<18} {:<18} {:>5} {:<9} {:>7} {:>7}\n",
        "DISTRICT", "UPAZILA", "SCORE", "LEVEL", "ACTIVE", "REPORTS"
    );
    out.push_str(&"-".repeat(69));
    out.push('\n');

    for area in areas {
        out.push_str(&format!(
            "{:<18} {:<18} {:>5} {:<9} {:>7} {:>7}\n",
            area.district,
            area.upazila,
            area.danger_score,
            area.danger_level.as_ref(),
            area.statistics.active_alerts,
            area.statistics.total_reports,
        ));
    }

    out
}

pub async fn recompute_area(db: &dyn Database, area: &AreaKey) -> CliResult {
    let stats = engine::recompute_area_statistics(db, area, Utc::now())
        .await?;
    println!("{area}: score {} ({})", stats.danger_score, stats.danger_level);
    Ok(())
}

pub async fn recompute_all(db: &dyn Database, multi: &MultiProgress) -> CliResult {
    let progress = IndicatifProgress::areas_bar(multi, "Loading areas...");
    let refreshed = bulk::recompute_all_areas(db, &progress).await?;
    println!("Recomputed {refreshed} area(s)");
    Ok(())
}

pub async fn seed_breakdown(db: &dyn Database) -> CliResult {
    let seeded = bulk::seed_incident_breakdown(db).await?;
    println!("Seeded incident breakdown for {seeded} area(s)");
    Ok(())
}

pub async fn show_area(db: &dyn Database, area: &AreaKey) -> CliResult {
    print_json(&reads::get_area(db, area).await?)
}

pub async fn show_district(db: &dyn Database, district: &str) -> CliResult {
    print_json(&reads::get_district(db, district).await?)
}

pub async fn show_dangerous(db: &dyn Database, limit: Option<u32>) -> CliResult {
    let areas = reads::get_dangerous_areas(db, limit).await?;
    if areas.is_empty() {
        println!("No high or critical areas.");
        return Ok(());
    }
    print!("{}", format_area_table(&areas));
    println!("\n{} area(s)", areas.len());
    Ok(())
}

pub async fn show_overall(db: &dyn Database) -> CliResult {
    print_json(&reads::get_overall(db).await?)
}

pub async fn show_trends(
    db: &dyn Database,
    district: Option<&str>,
    upazila: Option<&str>,
    months: Option<usize>,
) -> CliResult {
    print_json(&reads::get_trends(db, district, upazila, months).await?)
}

/// Runs the API server until it exits.
///
/// The server uses actix-web's runtime, so it runs on a blocking task to
/// avoid nesting it inside this tokio runtime.
pub async fn serve(config: ServerConfig) -> CliResult {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(khoj_server::serve(config))
    })
    .await??;
    Ok(())
}

/// Opens the database the CLI was pointed at.
pub async fn open_db(
    config: &ServerConfig,
) -> Result<Arc<dyn Database>, Box<dyn std::error::Error>> {
    let db = khoj_database::db::open(&config.database_path).await?;
    Ok(Arc::from(db))
}

#[cfg(test)]
mod tests {
    use khoj_statistics_models::DangerLevel;

    use super::*;

    #[test]
    fn table_lists_areas_in_given_order() {
        let mut savar =
            AreaStatistics::empty(&AreaKey::new("Dhaka", "Savar").unwrap(), Utc::now());
        savar.danger_score = 92;
        savar.danger_level = DangerLevel::Critical;
        savar.statistics.active_alerts = 20;
        let mut mirpur =
            AreaStatistics::empty(&AreaKey::new("Dhaka", "Mirpur").unwrap(), Utc::now());
        mirpur.danger_score = 60;
        mirpur.danger_level = DangerLevel::High;

        let table = format_area_table(&[savar, mirpur]);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("DISTRICT"));
        assert!(lines[2].contains("Savar") && lines[2].contains("critical"));
        assert!(lines[3].contains("Mirpur") && lines[3].contains("high"));
    }
}
