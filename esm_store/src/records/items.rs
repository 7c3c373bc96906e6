use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::impl_record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activator {
    pub id: String,
    pub name: String,
    pub model: String,
    pub script: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ApparatusType {
    #[default]
    MortarPestle = 0,
    Alembic = 1,
    Calcinator = 2,
    Retort = 3,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Apparatus {
    pub id: String,
    pub name: String,
    pub model: String,
    pub icon: String,
    pub script: String,
    pub kind: ApparatusType,
    pub quality: f32,
    pub weight: f32,
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub model: String,
    pub icon: String,
    pub text: String,
    /// Skill raised the first time the book is read.
    pub skill: i32,
    pub scroll: bool,
    pub weight: f32,
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Miscellaneous {
    pub id: String,
    pub name: String,
    pub model: String,
    pub icon: String,
    pub is_key: bool,
    pub weight: f32,
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weapon {
    pub id: String,
    pub name: String,
    pub model: String,
    pub kind: i16,
    pub weight: f32,
    pub value: i32,
    pub health: u16,
    pub speed: f32,
    pub reach: f32,
    pub chop: [u8; 2],
    pub slash: [u8; 2],
    pub thrust: [u8; 2],
}

impl_record!(Activator, b"ACTI", "Activator", true);
impl_record!(Apparatus, b"APPA", "Apparatus", true);
impl_record!(Book, b"BOOK", "Book", true);
impl_record!(Miscellaneous, b"MISC", "Miscellaneous", true);
impl_record!(Weapon, b"WEAP", "Weapon", true);
