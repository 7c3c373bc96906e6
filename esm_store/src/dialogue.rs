//! Dialogue topics and the header/detail merge that builds their info lists.
//!
//! A content file stores a topic as a `DIAL` header followed by the `INFO`
//! records that belong to it. Unlike other kinds, a topic's info list is not
//! replaced by later files: each file appends new infos and edits existing
//! ones in place, so the final list is the load-ordered union of every
//! file's contribution.

use std::collections::HashMap;

use esm_stream::RecordTag;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::collection::{RecordCollection, UpsertOutcome};
use crate::error::FormatError;
use crate::id::fold;
use crate::records::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum DialogueType {
    #[default]
    Topic = 0,
    Voice = 1,
    Greeting = 2,
    Persuasion = 3,
    Journal = 4,
}

/// One response line of a topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueInfo {
    pub id: String,
    pub speaker: String,
    pub text: String,
    pub disposition: i32,
    pub result_script: String,
    #[serde(skip)]
    deleted: bool,
}

impl DialogueInfo {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Tag of the detail records that follow a `DIAL` header.
    pub const TAG: RecordTag = RecordTag::new(b"INFO");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialogue {
    pub id: String,
    pub kind: DialogueType,
    #[serde(skip)]
    infos: Vec<DialogueInfo>,
    #[serde(skip)]
    info_index: HashMap<String, usize>,
}

/// What merging a single info did to its topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoMerge {
    Appended,
    Updated,
    MarkedDeleted,
    /// Deletion of an info the topic never had.
    Ignored,
}

impl Dialogue {
    pub fn new(id: impl Into<String>, kind: DialogueType) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Self::default()
        }
    }

    /// Live infos in first-seen order.
    pub fn infos(&self) -> impl Iterator<Item = &DialogueInfo> + '_ {
        self.infos.iter().filter(|info| !info.deleted)
    }

    pub fn info(&self, id: &str) -> Option<&DialogueInfo> {
        self.info_index
            .get(&fold(id))
            .map(|&position| &self.infos[position])
            .filter(|info| !info.deleted)
    }

    pub fn info_count(&self) -> usize {
        self.infos().count()
    }

    /// Append a new info or edit an existing one in place.
    ///
    /// A deleted info keeps its slot, so a later file that writes the same
    /// id brings it back at its original position.
    pub fn merge_info(&mut self, mut info: DialogueInfo, is_deleted: bool) -> InfoMerge {
        let key = fold(&info.id);
        match self.info_index.get(&key) {
            Some(&position) if is_deleted => {
                self.infos[position].deleted = true;
                InfoMerge::MarkedDeleted
            }
            Some(&position) => {
                info.deleted = false;
                self.infos[position] = info;
                InfoMerge::Updated
            }
            None if is_deleted => InfoMerge::Ignored,
            None => {
                info.deleted = false;
                self.info_index.insert(key, self.infos.len());
                self.infos.push(info);
                InfoMerge::Appended
            }
        }
    }
}

impl Record for Dialogue {
    const TAG: RecordTag = RecordTag::new(b"DIAL");
    const KIND: &'static str = "Dialogue";

    fn id(&self) -> &str {
        &self.id
    }

    fn carry_over(&mut self, previous: Self) {
        self.infos = previous.infos;
        self.info_index = previous.info_index;
    }
}

/// Which topic the detail records currently being read belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicCursor {
    #[default]
    NoActiveTopic,
    ActiveTopic(String),
}

/// Per-file driver of the header/detail contract.
///
/// One merger is used per content file, so the active topic never leaks from
/// one file into the next.
#[derive(Debug, Default)]
pub struct DialogueMerger {
    cursor: TopicCursor,
}

impl DialogueMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> &TopicCursor {
        &self.cursor
    }

    /// A `DIAL` header: upsert the topic and make it the active one.
    ///
    /// An existing topic keeps its infos. A deleted header still becomes
    /// active so the infos that follow it are attributed correctly.
    pub fn on_topic(
        &mut self,
        topics: &mut RecordCollection<Dialogue>,
        topic: Dialogue,
        is_deleted: bool,
        origin: Option<usize>,
    ) -> UpsertOutcome {
        let id = topic.id.clone();
        let outcome = topics.upsert_from(topic, is_deleted, origin);
        self.cursor = TopicCursor::ActiveTopic(id);
        outcome
    }

    /// An `INFO` detail record for the active topic.
    pub fn on_info(
        &mut self,
        topics: &mut RecordCollection<Dialogue>,
        info: DialogueInfo,
        is_deleted: bool,
        position: usize,
    ) -> Result<InfoMerge, FormatError> {
        let TopicCursor::ActiveTopic(topic_id) = &self.cursor else {
            return Err(FormatError::OrphanInfo {
                info: info.id,
                position,
            });
        };
        let topic = topics
            .slot_record_mut(topic_id)
            .ok_or_else(|| FormatError::OrphanInfo {
                info: info.id.clone(),
                position,
            })?;
        Ok(topic.merge_info(info, is_deleted))
    }

    /// Forget the active topic at the end of a file.
    pub fn reset(&mut self) {
        self.cursor = TopicCursor::NoActiveTopic;
    }
}
