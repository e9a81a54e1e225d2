use std::path::PathBuf;

use switchy_database::Database;

/// Opens a fresh database file under the system temp dir.
pub async fn temp_db(name: &str) -> Box<dyn Database> {
    let path: PathBuf = std::env::temp_dir().join(format!("khoj_database_test_{name}.db"));
    let _ = std::fs::remove_file(&path);
    crate::db::open(&path).await.unwrap()
}
