//! Cross-collection indices derived once loading is complete.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use esm_stream::RecordTag;
use log::{info, warn};
use serde::Serialize;

use crate::id::fold;
use crate::levelled::{CreatureLevList, ItemLevList, LevelledList};
use crate::records::{Class, GameSetting, Npc, Record, Script, StartScript, Variant};
use crate::store::RecordStore;

/// Value of a built-in game setting default.
#[derive(Debug, Clone, Copy)]
enum SettingDefault {
    Int(i32),
    Float(f32),
    Text(&'static str),
}

impl SettingDefault {
    fn to_variant(self) -> Variant {
        match self {
            SettingDefault::Int(value) => Variant::Int(value),
            SettingDefault::Float(value) => Variant::Float(value),
            SettingDefault::Text(value) => Variant::String(value.to_string()),
        }
    }
}

/// Values used for game settings no content file defines.
const DEFAULT_SETTINGS: &[(&str, SettingDefault)] = &[
    ("fDiseaseXferChance", SettingDefault::Float(1.0)),
    ("fFatigueBase", SettingDefault::Float(1.25)),
    ("fFatigueMult", SettingDefault::Float(0.5)),
    ("fJumpMoveBase", SettingDefault::Float(0.5)),
    ("fJumpMoveMult", SettingDefault::Float(0.5)),
    ("iLevelupTotal", SettingDefault::Int(10)),
    ("iMaxActivateDist", SettingDefault::Int(192)),
    ("iMaxInfoDist", SettingDefault::Int(192)),
    ("sDefaultCellname", SettingDefault::Text("Wilderness")),
    ("sMagicEffects", SettingDefault::Text("Magic Effects")),
];

/// A reference from one record to an id no live record has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub owner_kind: &'static str,
    pub owner: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreIndices {
    /// Live ids per kind, sorted case-insensitively.
    pub sorted_ids: BTreeMap<RecordTag, Vec<String>>,
    /// Folded id to the referenceable kind that owns it.
    pub id_kinds: HashMap<String, RecordTag>,
    /// Folded setting name to its effective value.
    pub settings: BTreeMap<String, Variant>,
    pub dangling: Vec<DanglingReference>,
}

impl StoreIndices {
    pub fn sorted(&self, tag: RecordTag) -> &[String] {
        self.sorted_ids.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl RecordStore {
    /// Derive every cross-collection index from the current records.
    ///
    /// Safe to call again after further loads: each call rebuilds from
    /// scratch, and two calls with no load in between produce equal indices.
    /// Records themselves are only read, so merge results do not depend on
    /// when this runs.
    pub fn set_up(&mut self) {
        let mut indices = StoreIndices::default();
        for tag in &self.order {
            let Some(collection) = self.collections.get(tag) else {
                continue;
            };
            let live = collection.live_ids();

            let mut sorted: Vec<String> = live.iter().map(|id| id.to_string()).collect();
            sorted.sort_by(|a, b| fold(a).cmp(&fold(b)).then_with(|| a.cmp(b)));
            indices.sorted_ids.insert(*tag, sorted);

            if !collection.referenceable() {
                continue;
            }
            for id in live {
                match indices.id_kinds.entry(fold(id)) {
                    Entry::Occupied(existing) => {
                        let owner = self
                            .collections
                            .get(existing.get())
                            .map(|c| c.kind())
                            .unwrap_or("?");
                        warn!(
                            "id '{id}' is defined as both {owner} and {}; lookups resolve to {owner}",
                            collection.kind()
                        );
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(*tag);
                    }
                }
            }
        }

        indices.settings = resolve_settings(self);
        indices.dangling = find_dangling(self, &indices.id_kinds);

        info!(
            "store set up: {} referenceable ids, {} settings, {} dangling references",
            indices.id_kinds.len(),
            indices.settings.len(),
            indices.dangling.len()
        );

        self.indices = indices;
        self.indices_current = true;
    }
}

fn resolve_settings(store: &RecordStore) -> BTreeMap<String, Variant> {
    let mut settings: BTreeMap<String, Variant> = DEFAULT_SETTINGS
        .iter()
        .map(|(name, value)| (fold(name), value.to_variant()))
        .collect();
    for setting in store.get::<GameSetting>().iter() {
        settings.insert(fold(&setting.id), setting.value.clone());
    }
    settings
}

fn find_dangling(
    store: &RecordStore,
    id_kinds: &HashMap<String, RecordTag>,
) -> Vec<DanglingReference> {
    let mut dangling = Vec::new();

    let mut check_list = |kind: &'static str, list: &LevelledList| {
        for item in &list.items {
            if !id_kinds.contains_key(&fold(&item.id)) {
                dangling.push(DanglingReference {
                    owner_kind: kind,
                    owner: list.id.clone(),
                    target: item.id.clone(),
                });
            }
        }
    };
    for list in store.get::<ItemLevList>().iter() {
        check_list(ItemLevList::KIND, &list.base);
    }
    for list in store.get::<CreatureLevList>().iter() {
        check_list(CreatureLevList::KIND, &list.base);
    }

    let classes = store.get::<Class>();
    for npc in store.get::<Npc>().iter() {
        if !npc.class.is_empty() && !classes.contains(&npc.class) {
            dangling.push(DanglingReference {
                owner_kind: Npc::KIND,
                owner: npc.id.clone(),
                target: npc.class.clone(),
            });
        }
    }

    let scripts = store.get::<Script>();
    for start in store.get::<StartScript>().iter() {
        if !scripts.contains(&start.script) {
            dangling.push(DanglingReference {
                owner_kind: StartScript::KIND,
                owner: start.id.clone(),
                target: start.script.clone(),
            });
        }
    }

    for reference in &dangling {
        warn!(
            "{} '{}' references missing record '{}'",
            reference.owner_kind, reference.owner, reference.target
        );
    }
    dangling
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{Dialogue, DialogueInfo, DialogueType};
    use crate::levelled::LevelItem;
    use crate::records::{Miscellaneous, Weapon};

    fn populated_store() -> RecordStore {
        let mut store = RecordStore::new();
        for id in ["Zebra_Hide", "apple", "Mortar"] {
            store.get_mut::<Miscellaneous>().upsert(
                Miscellaneous {
                    id: id.into(),
                    ..Miscellaneous::default()
                },
                false,
            );
        }
        store.get_mut::<ItemLevList>().upsert(
            ItemLevList {
                base: LevelledList {
                    id: "l_misc".into(),
                    items: vec![
                        LevelItem {
                            id: "apple".into(),
                            level: 1,
                        },
                        LevelItem {
                            id: "ghost".into(),
                            level: 1,
                        },
                    ],
                    ..LevelledList::default()
                },
            },
            false,
        );
        store.get_mut::<Npc>().upsert(
            Npc {
                id: "fargoth".into(),
                class: "commoner".into(),
                ..Npc::default()
            },
            false,
        );
        store.get_mut::<GameSetting>().upsert(
            GameSetting {
                id: "iLevelUpTotal".into(),
                value: Variant::Int(12),
            },
            false,
        );
        store
    }

    #[test]
    fn set_up_twice_yields_identical_indices() {
        let mut store = populated_store();
        store.set_up();
        let first = store.indices().clone();
        store.set_up();
        assert_eq!(&first, store.indices());
    }

    #[test]
    fn set_up_recomputes_after_further_loads() {
        let mut store = populated_store();
        store.set_up();
        assert_eq!(store.indices().sorted(Weapon::TAG).len(), 0);

        store.get_mut::<Weapon>().upsert(
            Weapon {
                id: "iron dagger".into(),
                ..Weapon::default()
            },
            false,
        );
        assert!(store.needs_set_up());
        store.set_up();
        assert_eq!(store.indices().sorted(Weapon::TAG), ["iron dagger"]);
        assert_eq!(store.find("Iron Dagger"), Some(Weapon::TAG));
    }

    #[test]
    fn sorted_index_ignores_case() {
        let mut store = populated_store();
        store.set_up();
        assert_eq!(
            store.indices().sorted(Miscellaneous::TAG),
            ["apple", "Mortar", "Zebra_Hide"]
        );
        let insertion: Vec<&str> = store.get::<Miscellaneous>().ids().collect();
        assert_eq!(insertion, vec!["Zebra_Hide", "apple", "Mortar"]);
    }

    #[test]
    fn settings_overlay_defaults() {
        let mut store = populated_store();
        store.set_up();
        assert_eq!(store.setting("ilevelupTotal"), Some(&Variant::Int(12)));
        assert_eq!(
            store.setting("fJumpMoveBase").and_then(Variant::as_float),
            Some(0.5)
        );
        assert_eq!(
            store.setting("iMaxActivateDist").and_then(Variant::as_int),
            Some(192)
        );
        assert_eq!(store.setting("sNoSuchSetting"), None);
    }

    #[test]
    fn dangling_references_are_collected() {
        let mut store = populated_store();
        store.set_up();
        let targets: Vec<&str> = store
            .indices()
            .dangling
            .iter()
            .map(|d| d.target.as_str())
            .collect();
        assert_eq!(targets, vec!["ghost", "commoner"]);
    }

    #[test]
    fn set_up_leaves_deleted_infos_in_their_slots() {
        let mut store = RecordStore::new();
        let mut topic = Dialogue::new("Morrowind Lore", DialogueType::Topic);
        topic.merge_info(DialogueInfo::new("1", "keep"), false);
        topic.merge_info(DialogueInfo::new("2", "drop"), false);
        topic.merge_info(DialogueInfo::new("3", "keep too"), false);
        topic.merge_info(DialogueInfo::new("2", ""), true);
        store.get_mut::<Dialogue>().upsert(topic, false);

        store.set_up();
        let topic = store.get::<Dialogue>().get("morrowind lore").unwrap();
        let ids: Vec<&str> = topic.infos().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        let mut topic = topic.clone();
        topic.merge_info(DialogueInfo::new("2", "back"), false);
        let ids: Vec<&str> = topic.infos().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
