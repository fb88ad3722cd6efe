//! Chance engine.
//!
//! Computes the success probability of a player action from character state
//! and an assessed difficulty. This is the only mechanical rule in the game
//! that does not go through the narrative model.
//!
//! Keyword matching is a content concern, so the keywords live in a
//! [`ChanceTable`] that can be swapped per language or loaded from config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest chance an action can have.
pub const MIN_CHANCE: f64 = 5.0;
/// Highest chance an action can have.
pub const MAX_CHANCE: f64 = 95.0;
/// Difficulty used when none could be assessed.
pub const DEFAULT_DIFFICULTY: u8 = 5;

/// Stat bonus: any keyword in the action adds `stat_multiplier × stat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRule {
    pub stat: String,
    pub keywords: Vec<String>,
}

/// Ability bonus: the ability flag plus the action keyword adds `bonus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityRule {
    pub ability: String,
    pub action_keyword: String,
    pub bonus: f64,
}

/// Item bonus: a carried item containing `item_keyword` plus the action
/// keyword adds `bonus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRule {
    pub item_keyword: String,
    pub action_keyword: String,
    pub bonus: f64,
}

/// Keyword tables and coefficients of the chance formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChanceTable {
    pub base_chance: f64,
    pub stat_multiplier: f64,
    pub difficulty_penalty: f64,
    pub stat_rules: Vec<StatRule>,
    pub ability_rules: Vec<AbilityRule>,
    pub item_rules: Vec<ItemRule>,
}

impl Default for ChanceTable {
    fn default() -> Self {
        Self::english()
    }
}

fn stat(name: &str, keywords: &[&str]) -> StatRule {
    StatRule {
        stat: name.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn ability(name: &str, action_keyword: &str, bonus: f64) -> AbilityRule {
    AbilityRule {
        ability: name.to_string(),
        action_keyword: action_keyword.to_string(),
        bonus,
    }
}

fn item(item_keyword: &str, action_keyword: &str, bonus: f64) -> ItemRule {
    ItemRule {
        item_keyword: item_keyword.to_string(),
        action_keyword: action_keyword.to_string(),
        bonus,
    }
}

impl ChanceTable {
    /// English keyword table.
    pub fn english() -> Self {
        Self {
            base_chance: 50.0,
            stat_multiplier: 3.0,
            difficulty_penalty: 5.0,
            stat_rules: vec![
                stat("Strength", &["strength", "force", "break", "push", "move"]),
                stat("Dexterity", &["dexterity", "dodge", "jump", "grab"]),
                stat("Intelligence", &["intelligence", "riddle", "learn", "understand"]),
                stat("Wisdom", &["wisdom", "persuade", "perceive", "notice"]),
                stat("Charisma", &["charisma", "seduce", "deceive", "intimidate"]),
            ],
            ability_rules: vec![
                ability("Magic", "magic", 25.0),
                ability("Lockpicking", "lock", 30.0),
                ability("Stealth", "stealth", 25.0),
            ],
            item_rules: vec![item("lockpick", "lock", 20.0), item("potion", "drink", 15.0)],
        }
    }

    /// Russian keyword table.
    pub fn russian() -> Self {
        Self {
            stat_rules: vec![
                stat("Сила", &["сила", "сдвинуть", "пробить", "сломать"]),
                stat("Ловкость", &["ловкость", "уклониться", "прыгнуть", "схватить"]),
                stat("Интеллект", &["интеллект", "загадка", "узнать", "понять"]),
                stat("Мудрость", &["мудрость", "убедить", "восприятие", "заметить"]),
                stat("Харизма", &["харизма", "соблазнить", "обмануть", "запугать"]),
            ],
            ability_rules: vec![
                ability("Магия", "магия", 25.0),
                ability("Взлом", "замок", 30.0),
                ability("Скрытность", "скрытно", 25.0),
            ],
            item_rules: vec![item("отмычка", "замок", 20.0), item("зелье", "выпить", 15.0)],
            ..Self::english()
        }
    }

    /// Names of the stats this table knows about, in rule order.
    pub fn stat_names(&self) -> Vec<&str> {
        self.stat_rules.iter().map(|rule| rule.stat.as_str()).collect()
    }
}

/// Computes the success chance of an action, clamped to [5, 95].
///
/// Pure: identical arguments always produce the same chance.
pub fn compute_chance(
    table: &ChanceTable,
    action: &str,
    stats: &BTreeMap<String, i32>,
    abilities: &BTreeMap<String, bool>,
    inventory: &[String],
    difficulty: u8,
) -> f64 {
    let action = action.to_lowercase();

    let stat_bonus: f64 = table
        .stat_rules
        .iter()
        .filter(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| action.contains(&keyword.to_lowercase()))
        })
        .map(|rule| table.stat_multiplier * f64::from(stats.get(&rule.stat).copied().unwrap_or(0)))
        .sum();

    let ability_bonus: f64 = table
        .ability_rules
        .iter()
        .filter(|rule| abilities.get(&rule.ability).copied().unwrap_or(false))
        .filter(|rule| action.contains(&rule.action_keyword.to_lowercase()))
        .map(|rule| rule.bonus)
        .sum();

    let item_bonus: f64 = table
        .item_rules
        .iter()
        .filter(|rule| {
            let needle = rule.item_keyword.to_lowercase();
            inventory.iter().any(|item| item.to_lowercase().contains(&needle))
        })
        .filter(|rule| action.contains(&rule.action_keyword.to_lowercase()))
        .map(|rule| rule.bonus)
        .sum();

    let penalty = table.difficulty_penalty * f64::from(difficulty);
    let chance = table.base_chance + stat_bonus + ability_bonus + item_bonus - penalty;
    chance.clamp(MIN_CHANCE, MAX_CHANCE)
}

/// Player-facing band of a chance value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChanceTier {
    AlmostCertain,
    FairlyGood,
    FiftyFifty,
    Risky,
    VeryDoubtful,
}

impl ChanceTier {
    /// Maps a chance (percent) to its tier using the rounded value.
    pub fn from_chance(chance: f64) -> Self {
        let rounded = chance.round();
        if rounded >= 80.0 {
            ChanceTier::AlmostCertain
        } else if rounded >= 60.0 {
            ChanceTier::FairlyGood
        } else if rounded >= 40.0 {
            ChanceTier::FiftyFifty
        } else if rounded >= 20.0 {
            ChanceTier::Risky
        } else {
            ChanceTier::VeryDoubtful
        }
    }

    /// Short label shown to the player.
    pub fn label(&self) -> &'static str {
        match self {
            ChanceTier::AlmostCertain => "Almost certain!",
            ChanceTier::FairlyGood => "Fairly good.",
            ChanceTier::FiftyFifty => "Fifty-fifty.",
            ChanceTier::Risky => "Risky...",
            ChanceTier::VeryDoubtful => "Very doubtful.",
        }
    }
}

impl fmt::Display for ChanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
