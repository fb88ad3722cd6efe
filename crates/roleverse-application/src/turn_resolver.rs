//! Turn resolution pipeline.
//!
//! One player action flows through
//! `validate → assess difficulty → compute chance → roll → narrate → commit`.
//! All work happens on an in-memory copy of the session under its turn lock,
//! and the copy is written back exactly once at the end. Anything that stops
//! a turn early leaves the stored session untouched.

use crate::roll::RollSource;
use crate::session::TurnLocks;
use once_cell::sync::Lazy;
use regex::Regex;
use roleverse_core::chance::{ChanceTable, ChanceTier, DEFAULT_DIFFICULTY, compute_chance};
use roleverse_core::config::GameConfig;
use roleverse_core::directive::{
    GAME_OVER_KEYWORD, INVENTORY_KEYWORD, extract_game_over_directive,
    extract_inventory_directive, strip_all_directives,
};
use roleverse_core::error::{Result, RoleverseError};
use roleverse_core::narrative::{ChatMessage, ModelError, NarrativeModel};
use roleverse_core::prompt::{
    DifficultyPrompt, OutcomePrompt, PromptLibrary, ValidationPrompt, WorldContextPrompt,
};
use roleverse_core::save::{MAX_WORLD_CONTEXT_CHARS, clip_chars, normalize_item_name};
use roleverse_core::session::{ConversationMessage, Session, SessionRepository};
use serde::Serialize;
use std::sync::Arc;

pub const VALIDATION_TEMPERATURE: f32 = 0.3;
pub const DIFFICULTY_TEMPERATURE: f32 = 0.2;
pub const CONTEXT_TEMPERATURE: f32 = 0.3;

/// Reply to any action on a finished story.
pub const GAME_OVER_MESSAGE: &str =
    "Your story has come to an end. Start a new game to play again.";
/// Reply when the narrative model failed mid-turn.
pub const MODEL_ERROR_APOLOGY: &str =
    "The Game Master lost the thread of the story. Please try that again in a moment.";
/// Reply when no narrative model is configured.
pub const MODEL_UNAVAILABLE_APOLOGY: &str =
    "The Game Master is not available right now. Check the model configuration and try again.";

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("integer pattern"));

/// Fixed player-facing text for a model failure.
pub fn apology_for(error: &ModelError) -> &'static str {
    match error {
        ModelError::Unavailable => MODEL_UNAVAILABLE_APOLOGY,
        _ => MODEL_ERROR_APOLOGY,
    }
}

/// Tunables of the pipeline.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub affirmative_token: String,
    pub max_action_chars: usize,
    pub narration_max_chars: usize,
    pub narration_temperature: f32,
    pub chance_table: ChanceTable,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

impl From<&GameConfig> for TurnSettings {
    fn from(config: &GameConfig) -> Self {
        Self {
            affirmative_token: config.rules.affirmative_token.clone(),
            max_action_chars: config.session.max_action_chars,
            narration_max_chars: config.rules.narration_max_chars,
            narration_temperature: config.model.temperature,
            chance_table: config.rules.chance.clone(),
        }
    }
}

/// Result of a resolved (committed) turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    pub difficulty: u8,
    pub chance: f64,
    pub tier: ChanceTier,
    pub roll: f64,
    pub success: bool,
    /// Narration with directives removed.
    pub narration: String,
    /// Items actually added to the inventory this turn.
    pub new_items: Vec<String>,
    pub world_context: String,
    pub game_over: bool,
    pub game_over_reason: Option<String>,
}

/// What a turn produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The story had already ended; nothing changed.
    GameOver(String),
    /// The model judged the action impossible; nothing changed.
    Rejected(String),
    /// The model failed; nothing changed.
    Degraded(String),
    /// The turn was resolved and saved.
    Resolved(TurnReport),
}

impl TurnOutcome {
    /// Text to show the player.
    pub fn message(&self) -> &str {
        match self {
            TurnOutcome::GameOver(text)
            | TurnOutcome::Rejected(text)
            | TurnOutcome::Degraded(text) => text,
            TurnOutcome::Resolved(report) => &report.narration,
        }
    }
}

/// Whether a validation reply grants the action.
///
/// Accepted iff the trimmed reply, with trailing punctuation removed, equals
/// the token case-insensitively, or the reply starts with the token followed
/// by a non-alphanumeric character ("Yes, but carefully").
pub fn is_affirmative(reply: &str, token: &str) -> bool {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return false;
    }

    let reply = reply.trim().to_lowercase();
    let core = reply.trim_end_matches(|c: char| !c.is_alphanumeric());
    if core == token {
        return true;
    }

    reply
        .strip_prefix(&token)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|next| !next.is_alphanumeric())
}

/// Parses the first integer of a difficulty reply, clamped to 1..=10.
pub fn parse_difficulty(reply: &str) -> Option<u8> {
    let value: i64 = INTEGER_RE.find(reply)?.as_str().parse().ok()?;
    Some(value.clamp(1, 10) as u8)
}

/// Runs player actions through the turn pipeline.
pub struct TurnResolver {
    repository: Arc<dyn SessionRepository>,
    model: Arc<dyn NarrativeModel>,
    locks: Arc<TurnLocks>,
    roll: Arc<dyn RollSource>,
    prompts: Arc<PromptLibrary>,
    settings: TurnSettings,
}

impl TurnResolver {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        model: Arc<dyn NarrativeModel>,
        locks: Arc<TurnLocks>,
        roll: Arc<dyn RollSource>,
        prompts: Arc<PromptLibrary>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            repository,
            model,
            locks,
            roll,
            prompts,
            settings,
        }
    }

    /// Resolves one player action.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist
    /// - `Validation` if the action is empty or too long, or no character exists
    /// - storage errors from loading or saving
    ///
    /// Model failures are not errors; they produce [`TurnOutcome::Degraded`].
    pub async fn resolve_turn(&self, session_id: &str, action: &str) -> Result<TurnOutcome> {
        let action = action.trim();
        if action.is_empty() {
            return Err(RoleverseError::validation("Action must not be empty"));
        }
        if action.chars().count() > self.settings.max_action_chars {
            return Err(RoleverseError::validation(format!(
                "Action exceeds {} characters",
                self.settings.max_action_chars
            )));
        }

        let _guard = self.locks.acquire(session_id).await;

        let mut session = self
            .repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| RoleverseError::session_not_found(session_id))?;

        if session.game_over {
            tracing::debug!("[TurnResolver] Session {} is over, ignoring action", session_id);
            return Ok(TurnOutcome::GameOver(GAME_OVER_MESSAGE.to_string()));
        }
        if !session.has_character() {
            return Err(RoleverseError::validation(
                "Create a character before taking actions",
            ));
        }

        // Validating
        let verdict = match self.validate(&session, action).await? {
            Ok(verdict) => verdict,
            Err(e) => return Ok(self.degraded(session_id, "validation", &e)),
        };
        if !is_affirmative(&verdict, &self.settings.affirmative_token) {
            tracing::info!("[TurnResolver] Action rejected for session {}", session_id);
            return Ok(TurnOutcome::Rejected(verdict));
        }

        // AssessingDifficulty
        let difficulty = self.assess_difficulty(&session, action).await?;

        // RollingChance
        let chance = compute_chance(
            &self.settings.chance_table,
            action,
            &session.stats,
            &session.abilities,
            &session.inventory,
            difficulty,
        );
        let roll = self.roll.roll();
        let success = roll < chance;
        tracing::info!(
            "[TurnResolver] Action: {}, Difficulty: {}, Chance: {:.2}, Roll: {:.2}, Success: {}",
            action,
            difficulty,
            chance,
            roll,
            success
        );

        // NarratingOutcome
        let outcome_prompt = self.prompts.render(&OutcomePrompt {
            action,
            outcome: if success { "SUCCESS" } else { "FAILURE" },
            max_chars: self.settings.narration_max_chars,
            inventory_keyword: INVENTORY_KEYWORD,
            game_over_keyword: GAME_OVER_KEYWORD,
        })?;
        let mut history: Vec<ChatMessage> = session.messages.iter().map(ChatMessage::from).collect();
        history.push(ChatMessage::user(outcome_prompt.clone()));

        let narration = match self
            .model
            .complete(&history, self.settings.narration_temperature)
            .await
        {
            Ok(narration) => narration,
            Err(e) => return Ok(self.degraded(session_id, "narration", &e)),
        };

        // Committing
        let (_, items) = extract_inventory_directive(&narration);
        let game_over_reason = extract_game_over_directive(&narration);
        let visible = strip_all_directives(&narration);

        let new_items: Vec<String> = items
            .iter()
            .map(|item| normalize_item_name(item))
            .filter(|item| session.add_item(item.as_str()))
            .collect();

        if let Some(reason) = &game_over_reason {
            tracing::info!("[TurnResolver] Session {} ended: {}", session_id, reason);
            session.mark_game_over();
        }

        session.messages.push(ConversationMessage::user(outcome_prompt));
        session.messages.push(ConversationMessage::assistant(narration));

        match self.update_world_context(&session, &visible).await? {
            Ok(context) => session.world_context = context,
            Err(e) => tracing::warn!(
                "[TurnResolver] World context update failed for session {}, keeping previous: {}",
                session_id,
                e
            ),
        }

        session.touch();
        self.repository.save(&session).await?;

        Ok(TurnOutcome::Resolved(TurnReport {
            difficulty,
            chance,
            tier: ChanceTier::from_chance(chance),
            roll,
            success,
            narration: visible,
            new_items,
            world_context: session.world_context.clone(),
            game_over: session.game_over,
            game_over_reason,
        }))
    }

    async fn validate(
        &self,
        session: &Session,
        action: &str,
    ) -> Result<std::result::Result<String, ModelError>> {
        let prompt = self.prompts.render(&ValidationPrompt {
            action,
            world_context: &session.world_context,
            ruleset: session.ruleset.as_deref().unwrap_or(""),
            affirmative_token: &self.settings.affirmative_token,
        })?;
        Ok(self
            .model
            .complete(&[ChatMessage::user(prompt)], VALIDATION_TEMPERATURE)
            .await)
    }

    /// Never fails the turn on model trouble; falls back to the default.
    async fn assess_difficulty(&self, session: &Session, action: &str) -> Result<u8> {
        let prompt = self.prompts.render(&DifficultyPrompt {
            action,
            world_context: &session.world_context,
        })?;

        let difficulty = match self
            .model
            .complete(&[ChatMessage::user(prompt)], DIFFICULTY_TEMPERATURE)
            .await
        {
            Ok(reply) => parse_difficulty(&reply).unwrap_or_else(|| {
                tracing::warn!(
                    "[TurnResolver] Could not parse difficulty from reply: {}",
                    reply
                );
                DEFAULT_DIFFICULTY
            }),
            Err(e) => {
                tracing::warn!("[TurnResolver] Difficulty assessment failed: {}", e);
                DEFAULT_DIFFICULTY
            }
        };
        Ok(difficulty)
    }

    async fn update_world_context(
        &self,
        session: &Session,
        event: &str,
    ) -> Result<std::result::Result<String, ModelError>> {
        let prompt = self.prompts.render(&WorldContextPrompt {
            previous_context: &session.world_context,
            event,
        })?;
        Ok(self
            .model
            .complete(&[ChatMessage::user(prompt)], CONTEXT_TEMPERATURE)
            .await
            .map(|context| clip_chars(&context, MAX_WORLD_CONTEXT_CHARS)))
    }

    fn degraded(&self, session_id: &str, step: &str, error: &ModelError) -> TurnOutcome {
        tracing::error!(
            "[TurnResolver] Model failed during {} for session {}: {}",
            step,
            session_id,
            error
        );
        TurnOutcome::Degraded(apology_for(error).to_string())
    }
}
