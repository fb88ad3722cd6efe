//! Interactive play loop.

use anyhow::{Context, Result};
use colored::Colorize;
use roleverse_application::views::{inventory_view, skills_view, status_view};
use roleverse_application::turn_resolver::GAME_OVER_MESSAGE;
use roleverse_application::{CharacterOutcome, TurnOutcome, TurnReport};
use roleverse_core::Session;
use roleverse_core::session::SessionPhase;
use roleverse_core::universe::UniverseKey;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::path::Path;

use crate::bootstrap::App;
use crate::commands::saves::{save_json, write_save};
use crate::helper::CliHelper;

type PlayEditor = Editor<CliHelper, DefaultHistory>;

/// A slash command typed during play.
#[derive(Debug, PartialEq)]
enum SlashCommand<'a> {
    Inventory,
    Status,
    Skills,
    Save(&'a str),
    Quit,
    Unknown(&'a str),
}

impl<'a> SlashCommand<'a> {
    /// Parses `line` if it starts with `/`.
    fn parse(line: &'a str) -> Option<Self> {
        let rest = line.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        Some(match name.to_lowercase().as_str() {
            "inventory" | "inv" => SlashCommand::Inventory,
            "status" => SlashCommand::Status,
            "skills" => SlashCommand::Skills,
            "save" => SlashCommand::Save(arg),
            "quit" | "exit" => SlashCommand::Quit,
            _ => SlashCommand::Unknown(line),
        })
    }
}

pub async fn run(app: &App, session_id: Option<String>) -> Result<()> {
    let mut rl: PlayEditor = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== RoleVerse ===".bright_magenta().bold());

    let session = match session_id {
        Some(id) => app
            .lifecycle
            .get_session(&id)
            .await
            .with_context(|| format!("Cannot resume session {id}"))?,
        None => {
            let id = app.lifecycle.create_session().await?;
            app.lifecycle.get_session(&id).await?
        }
    };
    let session_id = session.id.clone();
    println!("{}", format!("Session {session_id}").bright_black());

    match session.phase() {
        SessionPhase::ChoosingUniverse => {
            if !choose_universe(app, &mut rl, &session_id).await?
                || !create_character(app, &mut rl, &session_id).await?
            {
                return Ok(());
            }
        }
        SessionPhase::CreatingCharacter => {
            if !create_character(app, &mut rl, &session_id).await? {
                return Ok(());
            }
        }
        SessionPhase::Playing => {
            println!("{}", "Welcome back.".bright_green());
            print_narration(&session.world_context);
        }
        SessionPhase::GameOver => {
            println!("{}", GAME_OVER_MESSAGE.red());
            println!(
                "{}",
                "Use /status or /inventory to look back, /quit to leave.".bright_black()
            );
        }
    }

    println!(
        "{}",
        "Describe what you do. Commands: /inventory, /status, /skills, /save FILE, /quit"
            .bright_black()
    );
    game_loop(app, &mut rl, &session_id).await
}

/// Reads one non-empty line. `None` means the player left.
fn read_line(rl: &mut PlayEditor, prompt: &str) -> Result<Option<String>> {
    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);
                return Ok(Some(trimmed.to_string()));
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn is_quit(line: &str) -> bool {
    matches!(SlashCommand::parse(line), Some(SlashCommand::Quit))
}

/// Maps a menu answer (number or key) to a universe key.
fn universe_choice(answer: &str, options: &[UniverseKey]) -> String {
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| options.get(index))
        .map_or_else(|| answer.to_string(), |key| key.to_string())
}

async fn choose_universe(app: &App, rl: &mut PlayEditor, session_id: &str) -> Result<bool> {
    let options = UniverseKey::all();
    println!("{}", "Choose your universe:".bright_yellow());
    for (index, key) in options.iter().enumerate() {
        println!("  {}. {} ({})", index + 1, key.title(), key);
    }

    loop {
        let Some(answer) = read_line(rl, "universe> ")? else {
            return Ok(false);
        };
        if is_quit(&answer) {
            return Ok(false);
        }
        let key = universe_choice(&answer, &options);

        let custom_rules = if key.eq_ignore_ascii_case(UniverseKey::Custom.as_ref()) {
            println!("{}", "Describe the rules of your universe:".bright_yellow());
            match read_line(rl, "rules> ")? {
                Some(rules) => Some(rules),
                None => return Ok(false),
            }
        } else {
            None
        };

        match app
            .lifecycle
            .select_universe(session_id, &key, custom_rules.as_deref())
            .await
        {
            Ok(()) => return Ok(true),
            Err(e) if e.is_validation() => println!("{}", e.to_string().red()),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn create_character(app: &App, rl: &mut PlayEditor, session_id: &str) -> Result<bool> {
    println!("{}", "Describe the character you want to play:".bright_yellow());

    loop {
        let Some(wish) = read_line(rl, "character> ")? else {
            return Ok(false);
        };
        if is_quit(&wish) {
            return Ok(false);
        }

        println!("{}", "The game master is preparing your story...".bright_black());
        match app.lifecycle.create_character(session_id, &wish).await {
            Ok(CharacterOutcome::Created(report)) => {
                println!();
                print_narration(&report.opening);
                println!();
                let session = app.lifecycle.get_session(session_id).await?;
                println!("{}", inventory_view(&session).green());
                println!();
                return Ok(true);
            }
            Ok(CharacterOutcome::Degraded(apology)) => {
                println!("{}", apology.yellow());
                println!("{}", "Try describing your character again.".bright_black());
            }
            Err(e) if e.is_validation() => println!("{}", e.to_string().red()),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn game_loop(app: &App, rl: &mut PlayEditor, session_id: &str) -> Result<()> {
    loop {
        let Some(line) = read_line(rl, ">> ")? else {
            return Ok(());
        };

        if let Some(command) = SlashCommand::parse(&line) {
            if !run_slash_command(app, session_id, command).await? {
                println!("{}", "Goodbye!".bright_green());
                return Ok(());
            }
            continue;
        }

        println!("{}", format!("> {line}").green());
        match app.resolver.resolve_turn(session_id, &line).await {
            Ok(TurnOutcome::Resolved(report)) => print_turn(&report),
            Ok(TurnOutcome::Rejected(verdict)) => {
                println!("{}", "The game master does not allow that:".yellow());
                print_narration(&verdict);
            }
            Ok(TurnOutcome::Degraded(apology)) => println!("{}", apology.yellow()),
            Ok(TurnOutcome::GameOver(message)) => println!("{}", message.red()),
            Err(e) if e.is_validation() => println!("{}", e.to_string().red()),
            Err(e) if e.is_not_found() => {
                println!("{}", "This session no longer exists.".red());
                return Ok(());
            }
            Err(e) => {
                tracing::error!("[Play] Turn failed for session {}: {}", session_id, e);
                println!("{}", format!("Error: {e}").red());
            }
        }
        println!();
    }
}

/// Runs a slash command. Returns `false` when the player quits.
async fn run_slash_command(app: &App, session_id: &str, command: SlashCommand<'_>) -> Result<bool> {
    match command {
        SlashCommand::Quit => return Ok(false),
        SlashCommand::Inventory => print_view(app, session_id, inventory_view).await?,
        SlashCommand::Status => print_view(app, session_id, status_view).await?,
        SlashCommand::Skills => print_view(app, session_id, skills_view).await?,
        SlashCommand::Save("") => println!("{}", "Usage: /save FILE".yellow()),
        SlashCommand::Save(file) => {
            let json = save_json(app, session_id).await?;
            match write_save(Path::new(file), &json) {
                Ok(()) => println!("{}", format!("Saved to {file}").green()),
                Err(e) => println!("{}", format!("{e:#}").red()),
            }
        }
        SlashCommand::Unknown(line) => {
            println!("{}", format!("Unknown command: {line}").bright_black())
        }
    }
    Ok(true)
}

async fn print_view(app: &App, session_id: &str, view: fn(&Session) -> String) -> Result<()> {
    let session = app.lifecycle.get_session(session_id).await?;
    println!("{}", view(&session).cyan());
    Ok(())
}

fn print_narration(text: &str) {
    for line in text.lines() {
        println!("{}", line.bright_blue());
    }
}

fn print_turn(report: &TurnReport) {
    println!(
        "{}",
        format!("Chance of success: {:.0}% ({})", report.chance, report.tier).bright_yellow()
    );
    print_narration(&report.narration);

    for item in &report.new_items {
        println!("{}", format!("+ {item}").green());
    }
    if report.game_over {
        let reason = report.game_over_reason.as_deref().unwrap_or("");
        println!("{}", format!("GAME OVER {reason}").trim_end().red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_command_parse() {
        assert_eq!(SlashCommand::parse("/inventory"), Some(SlashCommand::Inventory));
        assert_eq!(SlashCommand::parse("/INV"), Some(SlashCommand::Inventory));
        assert_eq!(SlashCommand::parse("/save  hero.json"), Some(SlashCommand::Save("hero.json")));
        assert_eq!(SlashCommand::parse("/save"), Some(SlashCommand::Save("")));
        assert_eq!(SlashCommand::parse("/exit"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("/dance"), Some(SlashCommand::Unknown("/dance")));
        assert_eq!(SlashCommand::parse("open the door"), None);
    }

    #[test]
    fn test_universe_choice() {
        let options = UniverseKey::all();
        assert_eq!(universe_choice("1", &options), options[0].to_string());
        assert_eq!(universe_choice("cyberpunk", &options), "cyberpunk");
        assert_eq!(universe_choice("0", &options), "0");
        assert_eq!(universe_choice("99", &options), "99");
    }
}
