use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::impl_record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub description: String,
    pub attributes: [i32; 2],
    pub specialization: i32,
    pub major_skills: Vec<i32>,
    pub minor_skills: Vec<i32>,
    pub playable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Creature {
    pub id: String,
    pub name: String,
    pub model: String,
    pub script: String,
    pub level: i32,
    pub health: i32,
    pub magicka: i32,
    pub fatigue: i32,
    pub gold: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub race: String,
    pub class: String,
    pub faction: String,
    pub head: String,
    pub hair: String,
    pub script: String,
    pub level: i16,
    /// Stats are derived from class and level instead of stored.
    pub autocalc: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum SpellType {
    #[default]
    Spell = 0,
    Ability = 1,
    Blight = 2,
    Disease = 3,
    Curse = 4,
    Power = 5,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectEntry {
    pub effect: i16,
    pub magnitude_min: i32,
    pub magnitude_max: i32,
    pub duration: i32,
    pub area: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spell {
    pub id: String,
    pub name: String,
    pub kind: SpellType,
    pub cost: i32,
    pub effects: Vec<EffectEntry>,
}

impl_record!(Class, b"CLAS", "Class");
impl_record!(Creature, b"CREA", "Creature", true);
impl_record!(Npc, b"NPC_", "NPC", true);
impl_record!(Spell, b"SPEL", "Spell");
