use serde::{Deserialize, Serialize};

use super::impl_record;

/// Loosely typed value carried by settings and globals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    #[default]
    None,
    Int(i32),
    Float(f32),
    String(String),
}

impl Variant {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Variant::Float(f) => Some(*f),
            Variant::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Variant::Int(i) => Some(*i),
            Variant::Float(f) => Some(*f as i32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSetting {
    pub id: String,
    pub value: Variant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub id: String,
    pub value: Variant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub id: String,
    pub num_shorts: u32,
    pub num_longs: u32,
    pub num_floats: u32,
    #[serde(with = "serde_bytes")]
    pub bytecode: Vec<u8>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sound {
    pub id: String,
    pub sound: String,
    pub volume: u8,
    pub min_range: u8,
    pub max_range: u8,
}

/// Script started automatically when a game begins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartScript {
    pub id: String,
    pub script: String,
}

impl_record!(GameSetting, b"GMST", "GameSetting");
impl_record!(Global, b"GLOB", "Global");
impl_record!(Script, b"SCPT", "Script");
impl_record!(Sound, b"SOUN", "Sound");
impl_record!(StartScript, b"SSCR", "StartScript");
