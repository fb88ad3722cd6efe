//! Player-facing read-only views of a session.

use roleverse_core::session::{MAX_HEALTH, Session};

pub fn inventory_view(session: &Session) -> String {
    if session.inventory.is_empty() {
        return "Your inventory is empty.".to_string();
    }
    let items: Vec<String> = session
        .inventory
        .iter()
        .map(|item| format!("• {item}"))
        .collect();
    format!("Your inventory:\n\n{}", items.join("\n"))
}

/// Character summary, health and stats.
pub fn status_view(session: &Session) -> String {
    let character = session.character.as_deref().unwrap_or("Unknown");
    let mut text = format!(
        "Status:\n\n{character}\n\nHealth: {}/{MAX_HEALTH}",
        session.health
    );

    if !session.stats.is_empty() {
        text.push_str("\n\nStats:");
        for (name, value) in &session.stats {
            text.push_str(&format!("\n• {name}: {value}"));
        }
    }
    text
}

/// Abilities the character actually has.
pub fn skills_view(session: &Session) -> String {
    let skills: Vec<String> = session
        .abilities
        .iter()
        .filter(|(_, has)| **has)
        .map(|(name, _)| format!("• {name}"))
        .collect();

    if skills.is_empty() {
        "Your character has no special skills.".to_string()
    } else {
        format!("Your character's skills:\n\n{}", skills.join("\n"))
    }
}
