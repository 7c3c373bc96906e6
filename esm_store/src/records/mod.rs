//! Typed record payloads and the [`Record`] trait tying each one to its tag.

use esm_stream::RecordTag;
use serde::de::DeserializeOwned;
use serde::Serialize;

macro_rules! impl_record {
    ($ty:ty, $tag:literal, $kind:literal) => {
        impl_record!($ty, $tag, $kind, false);
    };
    ($ty:ty, $tag:literal, $kind:literal, $referenceable:literal) => {
        impl $crate::records::Record for $ty {
            const TAG: ::esm_stream::RecordTag = ::esm_stream::RecordTag::new($tag);
            const KIND: &'static str = $kind;
            const REFERENCEABLE: bool = $referenceable;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

pub(crate) use impl_record;

mod actors;
mod items;
mod world;

pub use actors::{Class, Creature, EffectEntry, Npc, Spell, SpellType};
pub use items::{Activator, Apparatus, ApparatusType, Book, Miscellaneous, Weapon};
pub use world::{GameSetting, Global, Script, Sound, StartScript, Variant};

/// A record kind stored in its own [`RecordCollection`](crate::RecordCollection).
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TAG: RecordTag;
    const KIND: &'static str;
    /// Whether instances can be placed in the world by id, which makes the
    /// kind part of the store-wide id index.
    const REFERENCEABLE: bool = false;

    fn id(&self) -> &str;

    /// Called when a newer write replaces `previous` for the same id.
    ///
    /// Kinds whose content accumulates across files move that content over
    /// here; everything else is plain last-writer-wins.
    fn carry_over(&mut self, previous: Self) {
        let _ = previous;
    }
}
