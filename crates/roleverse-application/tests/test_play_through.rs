use async_trait::async_trait;
use roleverse_application::{
    CharacterOutcome, FixedRoll, SessionLifecycle, TurnLocks, TurnOutcome, TurnResolver,
    TurnSettings,
};
use roleverse_core::chance::ChanceTable;
use roleverse_core::narrative::{ChatMessage, ModelError, NarrativeModel};
use roleverse_core::prompt::PromptLibrary;
use roleverse_core::session::SessionRepository;
use roleverse_infrastructure::FileSessionRepository;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct ReplayModel {
    replies: Mutex<VecDeque<&'static str>>,
}

impl ReplayModel {
    fn new(replies: &[&'static str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl NarrativeModel for ReplayModel {
    async fn complete(&self, _messages: &[ChatMessage], _temperature: f32) -> Result<String, ModelError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .map(str::to_string)
            .ok_or(ModelError::Unavailable)
    }
}

#[tokio::test]
async fn test_play_through_with_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let repository: Arc<dyn SessionRepository> =
        Arc::new(FileSessionRepository::new(temp_dir.path()).await.unwrap());
    let model = Arc::new(ReplayModel::new(&[
        "You arrive at the gates of Velmora at dusk. The guards eye you warily.\nINVENTORY_ADD: Sword, Torch\nCHARACTER_DATA: {\"stats\": {\"Strength\": 9, \"Wisdom\": 4}, \"abilities\": {\"Magic\": false}}",
        "YES",
        "4",
        "You shove the gate open and slip inside. A guard drops a key.\nINVENTORY_ADD: Iron key",
        "You stand inside Velmora's walls, an iron key in hand.",
    ]));
    let locks = Arc::new(TurnLocks::new());
    let prompts = Arc::new(PromptLibrary::new().unwrap());

    let lifecycle = SessionLifecycle::new(
        repository.clone(),
        model.clone(),
        locks.clone(),
        prompts.clone(),
        ChanceTable::english(),
        0.7,
    );
    let resolver = TurnResolver::new(
        repository.clone(),
        model,
        locks,
        Arc::new(FixedRoll(10.0)),
        prompts,
        TurnSettings::default(),
    );

    let id = lifecycle.create_session().await.unwrap();
    lifecycle.select_universe(&id, "fantasy", None).await.unwrap();
    let character = lifecycle.create_character(&id, "a wandering sellsword").await.unwrap();
    assert!(matches!(character, CharacterOutcome::Created(_)));

    let outcome = resolver.resolve_turn(&id, "I push the gate open").await.unwrap();
    let TurnOutcome::Resolved(report) = outcome else {
        panic!("expected a resolved turn");
    };
    assert!(report.success);
    assert_eq!(report.difficulty, 4);
    assert_eq!(report.new_items, vec!["Iron key"]);

    // A fresh repository over the same directory sees the committed turn.
    let reopened = FileSessionRepository::new(temp_dir.path()).await.unwrap();
    let session = reopened.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(session.inventory, vec!["Sword", "Torch", "Iron key"]);
    assert_eq!(session.messages.len(), 3);
    assert_eq!(
        session.world_context,
        "You stand inside Velmora's walls, an iron key in hand."
    );

    let record = lifecycle.export_save(&id).await.unwrap();
    assert_eq!(record.stats.get("Strength"), Some(&9));
    assert_eq!(record.abilities.get("Magic"), Some(&false));
}
