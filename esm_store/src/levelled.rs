//! Levelled item and creature lists, and picking an entry from one.

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::store::RecordStore;

/// Nested lists deeper than this are treated as a cycle.
const MAX_LIST_DEPTH: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelItem {
    pub id: String,
    pub level: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelledList {
    pub id: String,
    pub flags: u32,
    /// Percent chance, 0-100, that the list yields nothing.
    pub chance_none: u8,
    pub items: Vec<LevelItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemLevList {
    pub base: LevelledList,
}

impl ItemLevList {
    /// Roll once per item instead of once for the whole list.
    pub const EACH: u32 = 0x01;
    pub const ALL_LEVELS: u32 = 0x02;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatureLevList {
    pub base: LevelledList,
}

impl CreatureLevList {
    pub const ALL_LEVELS: u32 = 0x01;
}

macro_rules! impl_levelled_record {
    ($ty:ty, $tag:literal, $kind:literal) => {
        impl $crate::records::Record for $ty {
            const TAG: ::esm_stream::RecordTag = ::esm_stream::RecordTag::new($tag);
            const KIND: &'static str = $kind;
            const REFERENCEABLE: bool = true;

            fn id(&self) -> &str {
                &self.base.id
            }
        }
    };
}

impl_levelled_record!(ItemLevList, b"LEVI", "ItemLevList");
impl_levelled_record!(CreatureLevList, b"LEVC", "CreatureLevList");

/// Pick an id from `list` for an actor of `level`.
///
/// Returns `None` when the chance-none roll hits, when nothing is eligible,
/// or when the pick names a record the store does not have. Nested lists are
/// resolved recursively. The store is only read.
pub fn resolve_levelled<R: Rng>(
    store: &RecordStore,
    list: &LevelledList,
    creature: bool,
    level: i32,
    rng: &mut R,
) -> Option<String> {
    resolve_at_depth(store, list, creature, level, rng, 0)
}

fn resolve_at_depth<R: Rng>(
    store: &RecordStore,
    list: &LevelledList,
    creature: bool,
    level: i32,
    rng: &mut R,
    depth: usize,
) -> Option<String> {
    if depth >= MAX_LIST_DEPTH {
        warn!(
            "levelled list '{}' nests deeper than {MAX_LIST_DEPTH} lists; giving up",
            list.id
        );
        return None;
    }

    if rng.gen_range(0..100) < i32::from(list.chance_none) {
        return None;
    }

    let all_levels = if creature {
        list.flags & CreatureLevList::ALL_LEVELS != 0
    } else {
        list.flags & ItemLevList::ALL_LEVELS != 0
    };

    let highest = list
        .items
        .iter()
        .map(|item| i32::from(item.level))
        .filter(|&item_level| item_level <= level)
        .max()?;

    let candidates: Vec<&LevelItem> = list
        .items
        .iter()
        .filter(|item| {
            let item_level = i32::from(item.level);
            item_level <= level && (all_levels || item_level == highest)
        })
        .filter(|item| {
            let known = store.find(&item.id).is_some();
            if !known {
                warn!(
                    "ignoring nonexistent item '{}' in levelled list '{}'",
                    item.id, list.id
                );
            }
            known
        })
        .collect();

    if candidates.is_empty() {
        return None;
    }
    let chosen = candidates[rng.gen_range(0..candidates.len())];

    if let Some(nested) = store.get::<ItemLevList>().search(&chosen.id) {
        return resolve_at_depth(store, &nested.base, false, level, rng, depth + 1);
    }
    if let Some(nested) = store.get::<CreatureLevList>().search(&chosen.id) {
        return resolve_at_depth(store, &nested.base, true, level, rng, depth + 1);
    }
    Some(chosen.id.clone())
}
