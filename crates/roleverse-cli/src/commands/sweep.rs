use anyhow::{Result, anyhow};
use colored::Colorize;

use crate::bootstrap::App;

pub async fn run(app: &App, max_idle_minutes: Option<u64>) -> Result<()> {
    let minutes = max_idle_minutes.unwrap_or(app.config.session.idle_ttl_minutes);
    let max_age = i64::try_from(minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .ok_or_else(|| anyhow!("Idle limit of {} minutes is out of range", minutes))?;

    let expired = app.lifecycle.expire_idle(max_age).await?;
    if expired.is_empty() {
        println!(
            "{}",
            format!("No sessions idle for more than {minutes} minutes.").bright_black()
        );
        return Ok(());
    }

    println!("{}", format!("Removed {} idle session(s):", expired.len()).green());
    for id in expired {
        println!("  {id}");
    }
    Ok(())
}
