//! Interactive mode for the server.
//!
//! Prompts for bind address, port and database path before starting.

use dialoguer::{Confirm, Input};

use crate::config::{DEFAULT_BIND_ADDR, DEFAULT_PORT, ServerConfig};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Defaults come from the current environment. The answers are written
/// back to `BIND_ADDR`, `PORT` and `DATABASE_PATH` before delegating to
/// [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    let current = ServerConfig::from_env();

    println!("Khoj Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(current.bind_addr)
        .interact_text()
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(current.port)
        .interact_text()
        .unwrap_or(DEFAULT_PORT);

    let database_path: String = Input::new()
        .with_prompt("Database path")
        .default(current.database_path.display().to_string())
        .interact_text()
        .unwrap_or_else(|_| khoj_database::db::DEFAULT_DB_PATH.to_string());

    // SAFETY: single-threaded at this point, and the variables are read
    // once by `run_server` below.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", port.to_string());
        std::env::set_var("DATABASE_PATH", &database_path);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
