//! Prompt templates for the narrative model.
//!
//! Each prompt is a serializable request struct paired with a jinja template.
//! Templates are registered once in a [`PromptLibrary`] and rendered with the
//! request as context.

use crate::error::Result;
use minijinja::Environment;
use serde::Serialize;

/// A request that renders into a prompt.
pub trait PromptTemplate: Serialize {
    /// Template name inside the library.
    const NAME: &'static str;
    /// Jinja source of the template.
    const SOURCE: &'static str;
}

/// Asks whether an action is possible in the current situation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationPrompt<'a> {
    pub action: &'a str,
    pub world_context: &'a str,
    pub ruleset: &'a str,
    pub affirmative_token: &'a str,
}

impl PromptTemplate for ValidationPrompt<'_> {
    const NAME: &'static str = "validation";
    const SOURCE: &'static str = r#"You are the Game Master of a text adventure.
{% if ruleset %}World rules: {{ ruleset }}
{% endif %}Current situation: {{ world_context }}

The player attempts this action: "{{ action }}"

If the action is impossible or makes no sense here, explain to the player why it cannot be done, in a short in-character narrative (1-2 sentences). Do not use the phrase "impossible action".

If the action is possible, answer with exactly one word: {{ affirmative_token }}"#;
}

/// Asks for a 1-10 difficulty rating of an action.
#[derive(Debug, Clone, Serialize)]
pub struct DifficultyPrompt<'a> {
    pub action: &'a str,
    pub world_context: &'a str,
}

impl PromptTemplate for DifficultyPrompt<'_> {
    const NAME: &'static str = "difficulty";
    const SOURCE: &'static str = r#"Rate the difficulty of the player's action on a scale from 1 (very easy) to 10 (almost impossible).
Answer with a single number only.
Context: {{ world_context }}
Action: "{{ action }}""#;
}

/// Asks the model to narrate a resolved action.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomePrompt<'a> {
    pub action: &'a str,
    pub outcome: &'a str,
    pub max_chars: usize,
    pub inventory_keyword: &'a str,
    pub game_over_keyword: &'a str,
}

impl PromptTemplate for OutcomePrompt<'_> {
    const NAME: &'static str = "outcome";
    const SOURCE: &'static str = r#"The player performed the action: "{{ action }}".

The result of this action is: {{ outcome }}.

Describe the outcome in detail according to the result ({{ outcome }}). On FAILURE describe why it did not work. On SUCCESS describe what happened. Be concise but vivid (no more than {{ max_chars }} characters).

If the character obtains new items, end your reply with one line:
{{ inventory_keyword }}: item1, item2
If the character dies or the story definitively ends, end your reply with one line:
{{ game_over_keyword }}: short reason"#;
}

/// Asks the model to fold a new event into the world summary.
#[derive(Debug, Clone, Serialize)]
pub struct WorldContextPrompt<'a> {
    pub previous_context: &'a str,
    pub event: &'a str,
}

impl PromptTemplate for WorldContextPrompt<'_> {
    const NAME: &'static str = "world_context";
    const SOURCE: &'static str = r#"Based on the following game event, update the short description of the state of the world. Keep what matters and drop minor details. The answer must be 1-2 sentences.

PREVIOUS CONTEXT:
{{ previous_context }}

NEW EVENT:
{{ event }}

UPDATED CONTEXT:"#;
}

/// Asks the model to open the story and define the character.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterCreationPrompt<'a> {
    pub ruleset: &'a str,
    pub wish: &'a str,
    pub inventory_keyword: &'a str,
    pub character_keyword: &'a str,
    /// Example JSON payload of the character directive.
    pub character_example: &'a str,
}

impl PromptTemplate for CharacterCreationPrompt<'_> {
    const NAME: &'static str = "character_creation";
    const SOURCE: &'static str = r#"You are the Game Master. Create the beginning of a story.

WORLD RULES: {{ ruleset }}
PLAYER'S WISH: "{{ wish }}"

TASK:
1. Write a short description of the character and the starting location. Describe the event the game begins with.

IMPORTANT: Do not reveal the character's stats or abilities in the text. The player learns them through separate commands.

!!! CRITICAL RULE !!!
Your reply must end with two lines. First the inventory, then the character data.
Format:
{{ inventory_keyword }}: item1, item2, item3
{{ character_keyword }}: {{ character_example }}
THIS IS MANDATORY."#;
}

/// Registry of all prompt templates.
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    /// Creates a library with every built-in template registered.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(ValidationPrompt::NAME, ValidationPrompt::SOURCE)?;
        env.add_template(DifficultyPrompt::NAME, DifficultyPrompt::SOURCE)?;
        env.add_template(OutcomePrompt::NAME, OutcomePrompt::SOURCE)?;
        env.add_template(WorldContextPrompt::NAME, WorldContextPrompt::SOURCE)?;
        env.add_template(CharacterCreationPrompt::NAME, CharacterCreationPrompt::SOURCE)?;
        Ok(Self { env })
    }

    /// Renders a request with its registered template.
    pub fn render<T: PromptTemplate>(&self, request: &T) -> Result<String> {
        let template = self.env.get_template(T::NAME)?;
        Ok(template.render(request)?)
    }
}

impl std::fmt::Debug for PromptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptLibrary").finish_non_exhaustive()
    }
}
