use std::collections::HashMap;

use crate::error::StoreError;
use crate::id::fold;
use crate::records::Record;

/// What an upsert did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First time this id was seen.
    Inserted,
    /// A live record was overwritten.
    Replaced { previous_origin: Option<usize> },
    /// A tombstoned id came back with new data, in its original slot.
    Revived,
    /// The id is now deleted. `existed` is false when the tombstone was the
    /// first mention of the id.
    Tombstoned { existed: bool },
}

#[derive(Debug, Clone)]
struct Slot<T> {
    record: T,
    live: bool,
    origin: Option<usize>,
}

/// Merged table of one record kind.
///
/// Slots are kept in first-seen order and never removed: deleting an id only
/// marks its slot dead, so a later write for the same id revives it in place.
#[derive(Debug, Clone)]
pub struct RecordCollection<T> {
    slots: Vec<Slot<T>>,
    index: HashMap<String, usize>,
    live: usize,
}

impl<T> Default for RecordCollection<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            live: 0,
        }
    }
}

impl<T: Record> RecordCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, overwrite or tombstone the record for `record.id()`.
    pub fn upsert(&mut self, record: T, is_deleted: bool) -> UpsertOutcome {
        self.upsert_from(record, is_deleted, None)
    }

    /// Like [`upsert`](Self::upsert), remembering which content file wrote it.
    pub fn upsert_from(
        &mut self,
        record: T,
        is_deleted: bool,
        origin: Option<usize>,
    ) -> UpsertOutcome {
        let key = fold(record.id());
        let Some(&position) = self.index.get(&key) else {
            self.index.insert(key, self.slots.len());
            self.slots.push(Slot {
                record,
                live: !is_deleted,
                origin,
            });
            if is_deleted {
                return UpsertOutcome::Tombstoned { existed: false };
            }
            self.live += 1;
            return UpsertOutcome::Inserted;
        };

        let slot = &mut self.slots[position];
        let was_live = slot.live;
        let previous_origin = slot.origin;

        let previous = std::mem::replace(&mut slot.record, record);
        slot.record.carry_over(previous);
        slot.origin = origin;
        slot.live = !is_deleted;

        match (was_live, is_deleted) {
            (true, true) => {
                self.live -= 1;
                UpsertOutcome::Tombstoned { existed: true }
            }
            (false, true) => UpsertOutcome::Tombstoned { existed: true },
            (true, false) => UpsertOutcome::Replaced { previous_origin },
            (false, false) => {
                self.live += 1;
                UpsertOutcome::Revived
            }
        }
    }

    /// Case-insensitive lookup of a live record.
    pub fn search(&self, id: &str) -> Option<&T> {
        self.slot(id).filter(|slot| slot.live).map(|slot| &slot.record)
    }

    pub fn get(&self, id: &str) -> Result<&T, StoreError> {
        self.search(id).ok_or_else(|| StoreError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.search(id).is_some()
    }

    /// True when the id was seen and is currently deleted, as opposed to
    /// never having existed.
    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.slot(id).is_some_and(|slot| !slot.live)
    }

    /// Zero-based index of the content file that last wrote this id.
    pub fn origin(&self, id: &str) -> Option<usize> {
        self.slot(id).and_then(|slot| slot.origin)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live records in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.live)
            .map(|slot| &slot.record)
    }

    /// Ids of live records in first-seen order, with their stored casing.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|record| record.id())
    }

    /// Mutable access to a slot whether or not it is live.
    pub(crate) fn slot_record_mut(&mut self, id: &str) -> Option<&mut T> {
        let position = *self.index.get(&fold(id))?;
        Some(&mut self.slots[position].record)
    }

    fn slot(&self, id: &str) -> Option<&Slot<T>> {
        self.index
            .get(&fold(id))
            .map(|&position| &self.slots[position])
    }
}

impl<'a, T: Record> IntoIterator for &'a RecordCollection<T> {
    type Item = &'a T;
    type IntoIter = Box<dyn Iterator<Item = &'a T> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
