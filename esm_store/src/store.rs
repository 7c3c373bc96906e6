use std::any::Any;
use std::collections::HashMap;

use esm_stream::{RawRecord, RecordSource, RecordTag, StreamError};
use log::{debug, info};

use crate::collection::{RecordCollection, UpsertOutcome};
use crate::dialogue::{Dialogue, DialogueInfo, DialogueMerger};
use crate::error::{FormatError, StoreError};
use crate::finalize::StoreIndices;
use crate::id::fold;
use crate::levelled::{CreatureLevList, ItemLevList};
use crate::records::{
    Activator, Apparatus, Book, Class, Creature, GameSetting, Global, Miscellaneous, Npc, Record,
    Script, Sound, Spell, StartScript, Variant, Weapon,
};
use crate::session::{FileLoadStats, LoadListener};

/// Kind-agnostic view of a [`RecordCollection`], so collections of every
/// kind can sit in one registry.
pub(crate) trait ErasedCollection: Send + Sync {
    fn kind(&self) -> &'static str;
    fn referenceable(&self) -> bool;
    fn live_len(&self) -> usize;
    fn contains_id(&self, id: &str) -> bool;
    fn live_ids(&self) -> Vec<&str>;
    fn load_raw(
        &mut self,
        raw: &RawRecord<'_>,
        origin: usize,
    ) -> Result<(String, UpsertOutcome), StreamError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Record> ErasedCollection for RecordCollection<T> {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn referenceable(&self) -> bool {
        T::REFERENCEABLE
    }

    fn live_len(&self) -> usize {
        self.len()
    }

    fn contains_id(&self, id: &str) -> bool {
        self.contains(id)
    }

    fn live_ids(&self) -> Vec<&str> {
        self.ids().collect()
    }

    fn load_raw(
        &mut self,
        raw: &RawRecord<'_>,
        origin: usize,
    ) -> Result<(String, UpsertOutcome), StreamError> {
        let record: T = raw.decode()?;
        let id = record.id().to_string();
        let outcome = self.upsert_from(record, raw.is_deleted(), Some(origin));
        Ok((id, outcome))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Live record count of one declared kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSummary {
    pub tag: RecordTag,
    pub kind: &'static str,
    pub live: usize,
}

/// Every record collection of a content-loading session, keyed by kind.
pub struct RecordStore {
    pub(crate) collections: HashMap<RecordTag, Box<dyn ErasedCollection>>,
    pub(crate) order: Vec<RecordTag>,
    pub(crate) indices: StoreIndices,
    pub(crate) indices_current: bool,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("kinds", &self.kinds())
            .field("indices_current", &self.indices_current)
            .finish()
    }
}

impl RecordStore {
    /// A store with every built-in record kind declared.
    pub fn new() -> Self {
        let mut store = RecordStore {
            collections: HashMap::new(),
            order: Vec::new(),
            indices: StoreIndices::default(),
            indices_current: false,
        };
        store
            .declare::<Activator>()
            .declare::<Apparatus>()
            .declare::<Book>()
            .declare::<Class>()
            .declare::<Creature>()
            .declare::<Dialogue>()
            .declare::<GameSetting>()
            .declare::<Global>()
            .declare::<ItemLevList>()
            .declare::<CreatureLevList>()
            .declare::<Miscellaneous>()
            .declare::<Npc>()
            .declare::<Script>()
            .declare::<Sound>()
            .declare::<Spell>()
            .declare::<StartScript>()
            .declare::<Weapon>();
        store
    }

    /// Add a collection for `T`. Declaring the same kind twice is a no-op;
    /// two different kinds sharing a tag is a programming error.
    pub fn declare<T: Record>(&mut self) -> &mut Self {
        assert!(
            T::TAG != DialogueInfo::TAG,
            "{} is reserved for dialogue infos",
            DialogueInfo::TAG
        );
        match self.collections.get(&T::TAG) {
            Some(existing) => assert!(
                existing.as_any().is::<RecordCollection<T>>(),
                "record tag {} is already declared by {}",
                T::TAG,
                existing.kind()
            ),
            None => {
                self.collections
                    .insert(T::TAG, Box::new(RecordCollection::<T>::new()));
                self.order.push(T::TAG);
                self.indices_current = false;
            }
        }
        self
    }

    /// Collection of kind `T`.
    ///
    /// # Panics
    ///
    /// When `T` was never declared.
    pub fn get<T: Record>(&self) -> &RecordCollection<T> {
        self.try_get::<T>().unwrap_or_else(|| {
            panic!(
                "record kind {} ({}) is not declared in this store",
                T::KIND,
                T::TAG
            )
        })
    }

    /// Mutable collection of kind `T`; invalidates the derived indices.
    ///
    /// # Panics
    ///
    /// When `T` was never declared.
    pub fn get_mut<T: Record>(&mut self) -> &mut RecordCollection<T> {
        self.indices_current = false;
        self.collections
            .get_mut(&T::TAG)
            .and_then(|collection| collection.as_any_mut().downcast_mut())
            .unwrap_or_else(|| {
                panic!(
                    "record kind {} ({}) is not declared in this store",
                    T::KIND,
                    T::TAG
                )
            })
    }

    pub fn try_get<T: Record>(&self) -> Option<&RecordCollection<T>> {
        self.collections.get(&T::TAG)?.as_any().downcast_ref()
    }

    /// Declared kinds in declaration order, with their live counts.
    pub fn kinds(&self) -> Vec<KindSummary> {
        self.order
            .iter()
            .filter_map(|tag| {
                self.collections.get(tag).map(|collection| KindSummary {
                    tag: *tag,
                    kind: collection.kind(),
                    live: collection.live_len(),
                })
            })
            .collect()
    }

    /// Live ids of the kind with `tag`, in first-seen order.
    pub fn ids_of(&self, tag: RecordTag) -> Vec<&str> {
        self.collections
            .get(&tag)
            .map(|collection| collection.live_ids())
            .unwrap_or_default()
    }

    /// Which referenceable kind owns the live id, if any.
    pub fn find(&self, id: &str) -> Option<RecordTag> {
        if self.indices_current {
            return self.indices.id_kinds.get(&fold(id)).copied();
        }
        self.order.iter().copied().find(|tag| {
            self.collections
                .get(tag)
                .is_some_and(|collection| collection.referenceable() && collection.contains_id(id))
        })
    }

    /// Indices derived by the last [`set_up`](Self::set_up).
    pub fn indices(&self) -> &StoreIndices {
        &self.indices
    }

    /// Whether records changed since the last [`set_up`](Self::set_up).
    pub fn needs_set_up(&self) -> bool {
        !self.indices_current
    }

    /// Game setting value after defaults and loaded overrides, as of the
    /// last [`set_up`](Self::set_up).
    pub fn setting(&self, name: &str) -> Option<&Variant> {
        self.indices.settings.get(&fold(name))
    }

    /// Stream every record of `source` into its collection.
    ///
    /// Records applied before an error stay in the store.
    pub fn load<S: RecordSource + ?Sized>(
        &mut self,
        source: &mut S,
        file_index: usize,
        listener: &mut dyn LoadListener,
    ) -> Result<FileLoadStats, StoreError> {
        let name = source.name().to_string();
        let mut stats = FileLoadStats::new(&name, file_index);
        listener.set_label(&name);
        if let Some(total) = source.record_count_hint() {
            listener.set_progress_range(total);
        }

        self.indices_current = false;
        let mut merger = DialogueMerger::new();
        let mut position = 0usize;
        while let Some(raw) = source.next_record().map_err(FormatError::from)? {
            self.apply_record(&raw, position, file_index, &mut merger, &mut stats)?;
            position += 1;
            listener.increase_progress(1);
        }

        info!(
            "loaded {name} (#{file_index}): {} records, {} deleted, {} infos, {} skipped, {} overrides",
            stats.loaded,
            stats.deleted,
            stats.infos,
            stats.skipped,
            stats.total_overrides()
        );
        Ok(stats)
    }

    fn apply_record(
        &mut self,
        raw: &RawRecord<'_>,
        position: usize,
        file_index: usize,
        merger: &mut DialogueMerger,
        stats: &mut FileLoadStats,
    ) -> Result<(), StoreError> {
        let deleted = raw.is_deleted();

        if raw.tag == Dialogue::TAG {
            let topic: Dialogue = decode(raw, position)?;
            let outcome =
                merger.on_topic(self.get_mut::<Dialogue>(), topic, deleted, Some(file_index));
            stats.record(outcome);
            return Ok(());
        }

        if raw.tag == DialogueInfo::TAG {
            let info: DialogueInfo = decode(raw, position)?;
            let merged = merger.on_info(self.get_mut::<Dialogue>(), info, deleted, position)?;
            stats.record_info(merged);
            return Ok(());
        }

        match self.collections.get_mut(&raw.tag) {
            Some(collection) => {
                let (id, outcome) =
                    collection
                        .load_raw(raw, file_index)
                        .map_err(|source| FormatError::Decode {
                            tag: raw.tag,
                            position,
                            source,
                        })?;
                if let UpsertOutcome::Replaced {
                    previous_origin: Some(previous),
                } = outcome
                {
                    if previous != file_index {
                        debug!(
                            "{} '{id}' from {} overrides content file #{previous}",
                            raw.tag, stats.name
                        );
                    }
                }
                stats.record(outcome);
            }
            None if raw.is_required() => {
                return Err(FormatError::UnsupportedRequired {
                    tag: raw.tag,
                    position,
                }
                .into());
            }
            None => {
                debug!(
                    "skipping unsupported {} record #{position} in {}",
                    raw.tag, stats.name
                );
                stats.skipped += 1;
            }
        }
        Ok(())
    }
}

fn decode<T>(raw: &RawRecord<'_>, position: usize) -> Result<T, FormatError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    raw.decode().map_err(|source| FormatError::Decode {
        tag: raw.tag,
        position,
        source,
    })
}
