//! Session lifecycle: creation, universe choice, character creation,
//! save export/import and idle expiry.

use crate::session::{SessionUpdater, TurnLocks};
use crate::turn_resolver::apology_for;
use chrono::{Duration, Utc};
use roleverse_core::chance::ChanceTable;
use roleverse_core::directive::{
    CHARACTER_KEYWORD, INVENTORY_KEYWORD, extract_character_directive,
    extract_inventory_directive, strip_all_directives,
};
use roleverse_core::error::{Result, RoleverseError};
use roleverse_core::narrative::{ChatMessage, NarrativeModel};
use roleverse_core::prompt::{CharacterCreationPrompt, PromptLibrary};
use roleverse_core::save::{
    MAX_CHARACTER_CHARS, MAX_STAT_NAME_CHARS, MAX_STAT_VALUE, SaveRecord, clip_chars,
};
use roleverse_core::session::{ConversationMessage, MAX_HEALTH, Session, SessionRepository};
use roleverse_core::universe::{SANDBOX_RULESET, UniverseKey, resolve_ruleset};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Inventory given when the model names no starting items.
pub const DEFAULT_INVENTORY: [&str; 3] = ["Traveler's clothes", "Waterskin", "A few coins"];
/// Stat value given to every known stat when the model supplies none.
pub const DEFAULT_STAT_VALUE: i32 = 5;
/// Character text used when the model's opening is empty.
pub const FALLBACK_CHARACTER: &str =
    "A wanderer with a hazy past stands at the start of a new adventure.";
/// Longest character wish accepted.
pub const MAX_WISH_CHARS: usize = 1000;
/// Upper bound of the initial world context.
pub const MAX_OPENING_CONTEXT_CHARS: usize = 400;

/// Character state produced by a successful creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterReport {
    /// Player-visible opening of the story.
    pub opening: String,
    pub inventory: Vec<String>,
    pub stats: BTreeMap<String, i32>,
    pub abilities: BTreeMap<String, bool>,
}

/// What a character-creation request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacterOutcome {
    Created(CharacterReport),
    /// The model failed; the session is unchanged.
    Degraded(String),
}

/// First two sentences of `text`, capped at [`MAX_OPENING_CONTEXT_CHARS`].
pub fn opening_summary(text: &str) -> String {
    let text = text.trim();
    let mut sentences = 0;
    let mut end = text.len();
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?' | '…') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                sentences += 1;
                if sentences == 2 {
                    end = index + c.len_utf8();
                    break;
                }
            }
        }
    }

    text[..end]
        .chars()
        .take(MAX_OPENING_CONTEXT_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Manages session creation, setup, saves and expiry.
pub struct SessionLifecycle {
    repository: Arc<dyn SessionRepository>,
    model: Arc<dyn NarrativeModel>,
    locks: Arc<TurnLocks>,
    prompts: Arc<PromptLibrary>,
    updater: SessionUpdater,
    chance_table: ChanceTable,
    temperature: f32,
}

impl SessionLifecycle {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        model: Arc<dyn NarrativeModel>,
        locks: Arc<TurnLocks>,
        prompts: Arc<PromptLibrary>,
        chance_table: ChanceTable,
        temperature: f32,
    ) -> Self {
        let updater = SessionUpdater::new(repository.clone(), locks.clone());
        Self {
            repository,
            model,
            locks,
            prompts,
            updater,
            chance_table,
            temperature,
        }
    }

    /// Creates and stores an empty session, returning its ID.
    pub async fn create_session(&self) -> Result<String> {
        let session = Session::new(Uuid::new_v4().to_string());
        self.repository.save(&session).await?;
        tracing::info!("[SessionLifecycle] Created session {}", session.id);
        Ok(session.id)
    }

    /// Sets the universe and ruleset of a session that has no character yet.
    ///
    /// `custom_rules` is required (non-empty) for the `custom` universe and
    /// ignored for presets.
    pub async fn select_universe(
        &self,
        session_id: &str,
        universe_key: &str,
        custom_rules: Option<&str>,
    ) -> Result<()> {
        self.updater
            .update(session_id, |session| {
                if session.has_character() {
                    return Err(RoleverseError::validation(
                        "The universe cannot be changed after the character is created",
                    ));
                }
                let key = UniverseKey::parse(universe_key)?;
                let ruleset = resolve_ruleset(key, custom_rules)?;
                session.universe = Some(key.to_string());
                session.ruleset = Some(ruleset);
                Ok(())
            })
            .await?;

        tracing::info!(
            "[SessionLifecycle] Session {} selected universe {}",
            session_id,
            universe_key
        );
        Ok(())
    }

    /// Opens the story and creates the character from the player's wish.
    ///
    /// One model call. Fields the model fails to supply fall back to
    /// defaults, and everything is written in a single save. A model failure
    /// leaves the session unchanged.
    pub async fn create_character(&self, session_id: &str, wish: &str) -> Result<CharacterOutcome> {
        let wish = wish.trim();
        if wish.is_empty() {
            return Err(RoleverseError::validation("Character wish must not be empty"));
        }
        if wish.chars().count() > MAX_WISH_CHARS {
            return Err(RoleverseError::validation(format!(
                "Character wish exceeds {MAX_WISH_CHARS} characters"
            )));
        }

        let _guard = self.locks.acquire(session_id).await;

        let mut session = self
            .repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| RoleverseError::session_not_found(session_id))?;

        if session.has_character() {
            return Err(RoleverseError::validation("The character already exists"));
        }

        let ruleset = session
            .ruleset
            .clone()
            .unwrap_or_else(|| SANDBOX_RULESET.to_string());
        let example = self.character_example();
        let prompt = self.prompts.render(&CharacterCreationPrompt {
            ruleset: &ruleset,
            wish,
            inventory_keyword: INVENTORY_KEYWORD,
            character_keyword: CHARACTER_KEYWORD,
            character_example: &example,
        })?;

        let raw = match self
            .model
            .complete(&[ChatMessage::user(prompt)], self.temperature)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    "[SessionLifecycle] Character creation failed for session {}: {}",
                    session_id,
                    e
                );
                return Ok(CharacterOutcome::Degraded(apology_for(&e).to_string()));
            }
        };
        tracing::debug!("[SessionLifecycle] Character creation raw response:\n{}", raw);

        let (_, items) = extract_inventory_directive(&raw);
        let (stats, abilities) = extract_character_directive(&raw);
        let visible = strip_all_directives(&raw);

        let opening = if visible.is_empty() {
            tracing::warn!("[SessionLifecycle] Empty opening, using fallback character");
            FALLBACK_CHARACTER.to_string()
        } else {
            clip_chars(&visible, MAX_CHARACTER_CHARS)
        };

        session.inventory.clear();
        let items: Vec<String> = if items.is_empty() {
            DEFAULT_INVENTORY.iter().map(|item| item.to_string()).collect()
        } else {
            items
        };
        for item in items {
            session.add_item(item);
        }

        let stats: BTreeMap<String, i32> = stats
            .into_iter()
            .map(|(name, value)| {
                (
                    clip_chars(&name, MAX_STAT_NAME_CHARS),
                    value.clamp(0, MAX_STAT_VALUE as i32),
                )
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();
        session.stats = if stats.is_empty() {
            self.default_stats()
        } else {
            stats
        };
        session.abilities = abilities;
        session.health = MAX_HEALTH;
        session.game_over = false;
        session.ruleset = Some(ruleset);
        session.world_context = opening_summary(&opening);
        session.character = Some(opening.clone());
        session.messages = vec![ConversationMessage::assistant(raw)];
        session.touch();

        self.repository.save(&session).await?;
        tracing::info!(
            "[SessionLifecycle] Character created for session {}: inventory={:?}, stats={:?}, abilities={:?}",
            session_id,
            session.inventory,
            session.stats,
            session.abilities
        );

        Ok(CharacterOutcome::Created(CharacterReport {
            opening,
            inventory: session.inventory,
            stats: session.stats,
            abilities: session.abilities,
        }))
    }

    /// Exports the portable part of a session.
    pub async fn export_save(&self, session_id: &str) -> Result<SaveRecord> {
        let session = self.get_session(session_id).await?;
        Ok(SaveRecord::from_session(&session))
    }

    /// Validates a save record and starts a new session from it.
    pub async fn import_save(&self, record: SaveRecord) -> Result<String> {
        let record = record.validate()?;
        let session_id = Uuid::new_v4().to_string();
        let source_id = record.user_id.clone();
        let session = record.into_session(session_id.clone());
        self.repository.save(&session).await?;
        tracing::info!(
            "[SessionLifecycle] Imported save of {} as session {}",
            source_id,
            session_id
        );
        Ok(session_id)
    }

    /// Deletes sessions idle for longer than `max_age` and returns their IDs.
    pub async fn expire_idle(&self, max_age: Duration) -> Result<Vec<String>> {
        let cutoff = Utc::now() - max_age;
        let candidates = self.repository.list_idle_since(cutoff).await?;
        let mut expired = Vec::new();

        for session_id in candidates {
            let _guard = self.locks.acquire(&session_id).await;
            // a turn may have run since the scan
            let still_idle = self
                .repository
                .find_by_id(&session_id)
                .await?
                .is_some_and(|session| session.is_idle_since(cutoff));
            if !still_idle {
                continue;
            }
            self.repository.delete(&session_id).await?;
            self.locks.forget(&session_id).await;
            expired.push(session_id);
        }

        if !expired.is_empty() {
            tracing::info!("[SessionLifecycle] Expired {} idle session(s)", expired.len());
        }
        Ok(expired)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| RoleverseError::session_not_found(session_id))
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(session_id).await;
        if self.repository.find_by_id(session_id).await?.is_none() {
            return Err(RoleverseError::session_not_found(session_id));
        }
        self.repository.delete(session_id).await?;
        self.locks.forget(session_id).await;
        tracing::info!("[SessionLifecycle] Deleted session {}", session_id);
        Ok(())
    }

    /// All sessions, most recently active first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = self.repository.list_all().await?;
        sessions.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(sessions)
    }

    fn default_stats(&self) -> BTreeMap<String, i32> {
        self.chance_table
            .stat_names()
            .into_iter()
            .map(|name| (name.to_string(), DEFAULT_STAT_VALUE))
            .collect()
    }

    /// Example directive payload naming the stats the chance table knows.
    fn character_example(&self) -> String {
        let stats: serde_json::Map<String, serde_json::Value> = self
            .chance_table
            .stat_names()
            .into_iter()
            .zip([8, 7, 6, 5, 4].into_iter().cycle())
            .map(|(name, value)| (name.to_string(), serde_json::Value::from(value)))
            .collect();
        let abilities: serde_json::Map<String, serde_json::Value> = self
            .chance_table
            .ability_rules
            .last()
            .map(|rule| (rule.ability.clone(), serde_json::Value::Bool(true)))
            .into_iter()
            .collect();

        serde_json::json!({ "stats": stats, "abilities": abilities }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingRepository, ScriptedModel, playing_session};
    use roleverse_core::narrative::ModelError;

    const OPENING: &str = "You wake in a ditch outside Greyhollow. Rain hammers the road. A cart approaches.\nINVENTORY_ADD: Dagger, rope, Rope\nCHARACTER_DATA: {\"stats\": {\"Strength\": 25, \"Dexterity\": 7}, \"abilities\": {\"Stealth\": true}}";

    fn lifecycle(
        repository: Arc<CountingRepository>,
        model: Arc<ScriptedModel>,
    ) -> SessionLifecycle {
        SessionLifecycle::new(
            repository,
            model,
            Arc::new(TurnLocks::new()),
            Arc::new(PromptLibrary::new().unwrap()),
            ChanceTable::english(),
            0.7,
        )
    }

    #[test]
    fn test_opening_summary() {
        assert_eq!(
            opening_summary("One. Two! Three? Four."),
            "One. Two!"
        );
        assert_eq!(opening_summary("Just one sentence"), "Just one sentence");
        assert_eq!(opening_summary("Pi is 3.14 exactly. Yes. No."), "Pi is 3.14 exactly. Yes.");
        assert_eq!(opening_summary(&"x".repeat(600)).chars().count(), 400);
    }

    #[tokio::test]
    async fn test_create_session_stores_empty_session() {
        let repository = Arc::new(CountingRepository::new());
        let lifecycle = lifecycle(repository.clone(), Arc::new(ScriptedModel::silent()));

        let id = lifecycle.create_session().await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        let session = repository.stored(&id).unwrap();
        assert!(!session.has_character());
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn test_select_universe() {
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let lifecycle = lifecycle(repository.clone(), Arc::new(ScriptedModel::silent()));

        lifecycle.select_universe("s-1", "cyberpunk", None).await.unwrap();
        let stored = repository.stored("s-1").unwrap();
        assert_eq!(stored.universe.as_deref(), Some("cyberpunk"));
        assert!(stored.ruleset.unwrap().contains("megacity"));

        lifecycle
            .select_universe("s-1", "custom", Some("Everyone is a ghost."))
            .await
            .unwrap();
        assert_eq!(
            repository.stored("s-1").unwrap().ruleset.as_deref(),
            Some("Everyone is a ghost.")
        );

        let err = lifecycle.select_universe("s-1", "custom", Some(" ")).await.unwrap_err();
        assert!(err.is_validation());
        let err = lifecycle.select_universe("s-1", "western", None).await.unwrap_err();
        assert!(err.is_validation());
        let err = lifecycle.select_universe("ghost", "fantasy", None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_universe_is_immutable_after_character() {
        let repository = Arc::new(CountingRepository::with_session(playing_session("s-1")));
        let lifecycle = lifecycle(repository.clone(), Arc::new(ScriptedModel::silent()));

        let err = lifecycle.select_universe("s-1", "cyberpunk", None).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(repository.stored("s-1").unwrap().universe.as_deref(), Some("fantasy"));
    }

    #[tokio::test]
    async fn test_create_character_applies_directives() {
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let model = Arc::new(ScriptedModel::new([Ok(OPENING)]));
        let lifecycle = lifecycle(repository.clone(), model.clone());
        lifecycle.select_universe("s-1", "fantasy", None).await.unwrap();

        let outcome = lifecycle.create_character("s-1", "a disgraced knight").await.unwrap();
        let CharacterOutcome::Created(report) = outcome else {
            panic!("expected a created character");
        };

        let visible = "You wake in a ditch outside Greyhollow. Rain hammers the road. A cart approaches.";
        assert_eq!(report.opening, visible);
        assert_eq!(report.inventory, vec!["Dagger", "rope"]);
        assert_eq!(report.stats.get("Strength"), Some(&20));
        assert_eq!(report.stats.get("Dexterity"), Some(&7));
        assert_eq!(report.abilities.get("Stealth"), Some(&true));

        let stored = repository.stored("s-1").unwrap();
        assert_eq!(stored.character.as_deref(), Some(visible));
        assert_eq!(
            stored.world_context,
            "You wake in a ditch outside Greyhollow. Rain hammers the road."
        );
        assert_eq!(stored.health, 100);
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].content, OPENING);
        assert!(!stored.game_over);

        let prompt = &model.requests()[0].0[0].content;
        assert!(prompt.contains("a disgraced knight"));
        assert!(prompt.contains("medieval"));
        assert!(prompt.contains("CHARACTER_DATA: {\"abilities\""));
    }

    #[tokio::test]
    async fn test_create_character_fallbacks() {
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let model = Arc::new(ScriptedModel::new([Ok(
            "INVENTORY_ADD: \nCHARACTER_DATA: {broken",
        )]));
        let lifecycle = lifecycle(repository.clone(), model.clone());

        let CharacterOutcome::Created(report) =
            lifecycle.create_character("s-1", "anyone").await.unwrap()
        else {
            panic!("expected a created character");
        };

        assert_eq!(report.opening, FALLBACK_CHARACTER);
        assert_eq!(report.inventory, DEFAULT_INVENTORY.to_vec());
        assert_eq!(report.stats.len(), 5);
        assert!(report.stats.values().all(|value| *value == DEFAULT_STAT_VALUE));
        assert!(report.abilities.is_empty());

        let stored = repository.stored("s-1").unwrap();
        assert_eq!(stored.ruleset.as_deref(), Some(SANDBOX_RULESET));
        assert!(model.requests()[0].0[0].content.contains(SANDBOX_RULESET));
    }

    #[tokio::test]
    async fn test_fallback_character_survives_export_and_import() {
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let model = Arc::new(ScriptedModel::new([Ok("You set out at dawn.")]));
        let lifecycle = lifecycle(repository, model);

        lifecycle.create_character("s-1", "a pilgrim").await.unwrap();
        let before = lifecycle.get_session("s-1").await.unwrap();
        assert_eq!(before.inventory[0], "Traveler's clothes");

        let record = lifecycle.export_save("s-1").await.unwrap();
        let new_id = lifecycle.import_save(record).await.unwrap();
        let after = lifecycle.get_session(&new_id).await.unwrap();

        assert_eq!(after.inventory, before.inventory);
        assert_eq!(after.stats, before.stats);
        assert_eq!(after.character, before.character);
    }

    #[tokio::test]
    async fn test_oversized_model_fields_are_clipped_into_a_valid_save() {
        let reply = format!(
            "A giant of a tale.\nINVENTORY_ADD: {}, Dragon's tooth\nCHARACTER_DATA: {{\"stats\": {{\"{}\": 9, \" \": 3}}}}",
            "q".repeat(150),
            "S".repeat(80)
        );
        let model = Arc::new(ScriptedModel::owned([reply]));
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let lifecycle = lifecycle(repository, model);

        let CharacterOutcome::Created(report) =
            lifecycle.create_character("s-1", "a giant").await.unwrap()
        else {
            panic!("expected a created character");
        };
        assert_eq!(report.inventory[0].chars().count(), 100);
        assert_eq!(report.inventory[1], "Dragon's tooth");
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.stats.get(&"S".repeat(50)), Some(&9));

        let record = lifecycle.export_save("s-1").await.unwrap();
        assert_eq!(record.clone().validate().unwrap(), record);
        assert!(lifecycle.import_save(record).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_character_model_failure_changes_nothing() {
        let before = Session::new("s-1");
        let repository = Arc::new(CountingRepository::with_session(before.clone()));
        let model = Arc::new(ScriptedModel::new([Err(ModelError::Timeout)]));
        let lifecycle = lifecycle(repository.clone(), model);

        let outcome = lifecycle.create_character("s-1", "a bard").await.unwrap();
        assert!(matches!(outcome, CharacterOutcome::Degraded(_)));
        assert_eq!(repository.saves(), 0);
        assert_eq!(repository.stored("s-1").unwrap(), before);
    }

    #[tokio::test]
    async fn test_create_character_rejections() {
        let repository = Arc::new(CountingRepository::with_session(playing_session("s-1")));
        let model = Arc::new(ScriptedModel::silent());
        let lifecycle = lifecycle(repository, model.clone());

        assert!(lifecycle.create_character("s-1", "again").await.unwrap_err().is_validation());
        assert!(lifecycle.create_character("s-1", "  ").await.unwrap_err().is_validation());
        assert!(lifecycle.create_character("none", "a bard").await.unwrap_err().is_not_found());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let mut session = playing_session("s-1");
        session.abilities.insert("Stealth".to_string(), true);
        session.health = 73;
        let repository = Arc::new(CountingRepository::with_session(session.clone()));
        let lifecycle = lifecycle(repository.clone(), Arc::new(ScriptedModel::silent()));

        let record = lifecycle.export_save("s-1").await.unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let record: SaveRecord = serde_json::from_str(&json).unwrap();

        let new_id = lifecycle.import_save(record).await.unwrap();
        assert_ne!(new_id, "s-1");

        let imported = lifecycle.get_session(&new_id).await.unwrap();
        assert_eq!(imported.inventory, session.inventory);
        assert_eq!(imported.stats, session.stats);
        assert_eq!(imported.abilities, session.abilities);
        assert_eq!(imported.world_context, session.world_context);
        assert_eq!(imported.health, 73);
        assert_eq!(imported.game_over, session.game_over);
        assert!(imported.messages.is_empty());
        assert!(imported.universe.is_none());
        assert!(imported.ruleset.is_none());
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_record() {
        let repository = Arc::new(CountingRepository::new());
        let lifecycle = lifecycle(repository.clone(), Arc::new(ScriptedModel::silent()));

        let mut record = SaveRecord::from_session(&playing_session("s-1"));
        record.stats.insert("Strength".to_string(), 21);

        let err = lifecycle.import_save(record).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(repository.saves(), 0);
    }

    #[tokio::test]
    async fn test_expire_idle() {
        let mut stale = playing_session("stale");
        stale.last_active = Utc::now() - Duration::hours(3);
        let repository = Arc::new(CountingRepository::with_session(stale));
        repository.save(&playing_session("active")).await.unwrap();
        let lifecycle = lifecycle(repository.clone(), Arc::new(ScriptedModel::silent()));

        let expired = lifecycle.expire_idle(Duration::hours(1)).await.unwrap();
        assert_eq!(expired, vec!["stale"]);
        assert!(repository.stored("stale").is_none());
        assert!(repository.stored("active").is_some());
        assert_eq!(lifecycle.list_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let repository = Arc::new(CountingRepository::with_session(Session::new("s-1")));
        let lifecycle = lifecycle(repository.clone(), Arc::new(ScriptedModel::silent()));

        lifecycle.delete_session("s-1").await.unwrap();
        assert!(lifecycle.get_session("s-1").await.unwrap_err().is_not_found());
        assert!(lifecycle.delete_session("s-1").await.unwrap_err().is_not_found());
        assert_eq!(repository.deletes(), 1);
    }
}
