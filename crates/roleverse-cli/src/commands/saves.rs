use anyhow::{Context, Result};
use colored::Colorize;
use roleverse_core::SaveRecord;
use roleverse_core::session::SessionPhase;
use std::path::Path;

use crate::bootstrap::App;

pub async fn list(app: &App) -> Result<()> {
    let sessions = app.lifecycle.list_sessions().await?;
    if sessions.is_empty() {
        println!("{}", "No sessions yet. Run `roleverse play` to start one.".bright_black());
        return Ok(());
    }

    for session in sessions {
        let universe = session.universe.as_deref().unwrap_or("-");
        let state = match session.phase() {
            SessionPhase::GameOver => "ended".red(),
            SessionPhase::Playing => "playing".green(),
            SessionPhase::ChoosingUniverse | SessionPhase::CreatingCharacter => "setup".yellow(),
        };
        println!(
            "{}  {:<12} {:<8} last active {}",
            session.id.bold(),
            universe,
            state,
            session.last_active.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn export(app: &App, session_id: &str, out: Option<&Path>) -> Result<()> {
    let json = save_json(app, session_id).await?;
    match out {
        Some(path) => {
            write_save(path, &json)?;
            println!("{}", format!("Saved to {}", path.display()).green());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn import(app: &App, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let record: SaveRecord = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as a save file", file.display()))?;

    let session_id = app.lifecycle.import_save(record).await?;
    println!("{}", format!("Imported as session {session_id}").green());
    println!(
        "{}",
        format!("Continue with: roleverse play --session {session_id}").bright_black()
    );
    Ok(())
}

/// Pretty-printed save record of a session.
pub async fn save_json(app: &App, session_id: &str) -> Result<String> {
    let record = app.lifecycle.export_save(session_id).await?;
    Ok(serde_json::to_string_pretty(&record)?)
}

pub fn write_save(path: &Path, json: &str) -> Result<()> {
    std::fs::write(path, format!("{json}\n"))
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_save_ends_with_newline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("save.json");

        write_save(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");

        let missing = temp_dir.path().join("no-such-dir").join("save.json");
        assert!(write_save(&missing, "{}").is_err());
    }
}
