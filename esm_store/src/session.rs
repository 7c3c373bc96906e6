//! Ordered application of content files to a [`RecordStore`].

use std::collections::BTreeMap;

use esm_stream::RecordSource;
use log::{error, info};
use serde::Serialize;

use crate::collection::UpsertOutcome;
use crate::dialogue::InfoMerge;
use crate::error::LoadError;
use crate::store::RecordStore;

/// Progress callbacks for a long-running load. Every method defaults to a
/// no-op.
pub trait LoadListener {
    fn set_label(&mut self, _label: &str) {}
    fn set_progress_range(&mut self, _total: usize) {}
    fn increase_progress(&mut self, _amount: usize) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl LoadListener for NullListener {}

/// What one content file contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileLoadStats {
    pub name: String,
    pub index: usize,
    /// Records inserted, replaced or revived.
    pub loaded: usize,
    pub deleted: usize,
    /// Records of kinds the store does not declare.
    pub skipped: usize,
    /// Dialogue infos appended, updated or deleted.
    pub infos: usize,
    /// Records replaced per earlier content file index.
    pub overrides: BTreeMap<usize, usize>,
}

impl FileLoadStats {
    pub(crate) fn new(name: &str, index: usize) -> Self {
        Self {
            name: name.to_string(),
            index,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Tombstoned { .. } => self.deleted += 1,
            UpsertOutcome::Replaced { previous_origin } => {
                self.loaded += 1;
                if let Some(previous) = previous_origin.filter(|&p| p != self.index) {
                    *self.overrides.entry(previous).or_default() += 1;
                }
            }
            UpsertOutcome::Inserted | UpsertOutcome::Revived => self.loaded += 1,
        }
    }

    pub(crate) fn record_info(&mut self, merge: InfoMerge) {
        if merge != InfoMerge::Ignored {
            self.infos += 1;
        }
    }

    pub fn total_overrides(&self) -> usize {
        self.overrides.values().sum()
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub files: Vec<FileLoadStats>,
}

impl LoadReport {
    pub fn total_loaded(&self) -> usize {
        self.files.iter().map(|f| f.loaded).sum()
    }
}

/// Applies content files to a store in load order.
///
/// Each applied file gets the next zero-based index, which is what record
/// origins and override counts refer to. A failed file still consumes its
/// index.
pub struct LoadSession<'s> {
    store: &'s mut RecordStore,
    listener: Box<dyn LoadListener + 's>,
    next_index: usize,
    files: Vec<FileLoadStats>,
}

impl<'s> LoadSession<'s> {
    pub fn new(store: &'s mut RecordStore) -> Self {
        Self::with_listener(store, NullListener)
    }

    pub fn with_listener(store: &'s mut RecordStore, listener: impl LoadListener + 's) -> Self {
        Self {
            store,
            listener: Box::new(listener),
            next_index: 0,
            files: Vec::new(),
        }
    }

    /// Load one content file on top of everything applied so far.
    pub fn apply<S: RecordSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<&FileLoadStats, LoadError> {
        let index = self.next_index;
        self.next_index += 1;
        let file = source.name().to_string();

        match self.store.load(source, index, self.listener.as_mut()) {
            Ok(stats) => {
                self.files.push(stats);
                Ok(&self.files[self.files.len() - 1])
            }
            Err(err) => {
                error!("aborting load at {file} (content file #{index}): {err}");
                Err(LoadError {
                    index,
                    file,
                    source: err,
                })
            }
        }
    }

    /// Apply every source in order, stopping at the first failure.
    pub fn apply_all<'a, S, I>(&mut self, sources: I) -> Result<(), LoadError>
    where
        S: RecordSource + ?Sized + 'a,
        I: IntoIterator<Item = &'a mut S>,
    {
        for source in sources {
            self.apply(source)?;
        }
        Ok(())
    }

    /// Stats of the files applied successfully so far.
    pub fn files(&self) -> &[FileLoadStats] {
        &self.files
    }

    /// Finalize the store and return the per-file summary.
    pub fn finish(self) -> LoadReport {
        self.store.set_up();
        info!("load session finished with {} content files", self.files.len());
        LoadReport { files: self.files }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Apparatus, Record};
    use esm_stream::RecordBuffer;

    #[derive(Default)]
    struct CountingListener {
        labels: Vec<String>,
        range: usize,
        progress: usize,
    }

    impl LoadListener for &mut CountingListener {
        fn set_label(&mut self, label: &str) {
            self.labels.push(label.to_string());
        }

        fn set_progress_range(&mut self, total: usize) {
            self.range += total;
        }

        fn increase_progress(&mut self, amount: usize) {
            self.progress += amount;
        }
    }

    fn apparatus_file(name: &str, ids: &[&str]) -> RecordBuffer {
        let mut file = RecordBuffer::new(name);
        for id in ids {
            file.push(
                Apparatus::TAG,
                false,
                &Apparatus {
                    id: id.to_string(),
                    ..Apparatus::default()
                },
            )
            .unwrap();
        }
        file
    }

    #[test]
    fn overrides_are_attributed_to_earlier_files() {
        let mut store = RecordStore::new();
        let mut base = apparatus_file("base.esm", &["a", "b", "c"]);
        let mut patch = apparatus_file("patch.esp", &["A", "d"]);
        let mut fix = apparatus_file("fix.esp", &["b", "D"]);

        let mut session = LoadSession::new(&mut store);
        session.apply(&mut base).unwrap();
        let stats = session.apply(&mut patch).unwrap().clone();
        assert_eq!(stats.index, 1);
        assert_eq!(stats.overrides, BTreeMap::from([(0, 1)]));

        let stats = session.apply(&mut fix).unwrap();
        assert_eq!(stats.overrides, BTreeMap::from([(0, 1), (1, 1)]));
        assert_eq!(stats.total_overrides(), 2);

        let report = session.finish();
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.total_loaded(), 7);
        assert_eq!(store.get::<Apparatus>().len(), 4);
        assert_eq!(store.get::<Apparatus>().origin("d"), Some(2));
        assert!(!store.needs_set_up());
    }

    #[test]
    fn listener_sees_every_file() {
        let mut listener = CountingListener::default();
        let mut store = RecordStore::new();
        let mut files = vec![
            apparatus_file("one.esm", &["x"]),
            apparatus_file("two.esp", &["y", "z"]),
        ];
        {
            let mut session = LoadSession::with_listener(&mut store, &mut listener);
            session.apply_all(files.iter_mut()).unwrap();
            assert_eq!(session.files().len(), 2);
        }
        assert_eq!(listener.labels, vec!["one.esm", "two.esp"]);
        assert_eq!(listener.range, 3);
        assert_eq!(listener.progress, 3);
    }

    #[test]
    fn failed_file_reports_its_index_and_name() {
        let mut store = RecordStore::new();
        let mut good = apparatus_file("good.esm", &["a"]);
        let mut bad = RecordBuffer::new("bad.esp");
        bad.push(
            crate::dialogue::DialogueInfo::TAG,
            false,
            &crate::dialogue::DialogueInfo::new("1", "orphan"),
        )
        .unwrap();

        let mut session = LoadSession::new(&mut store);
        session.apply(&mut good).unwrap();
        let err = session.apply(&mut bad).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.file, "bad.esp");
        assert!(err.to_string().contains("bad.esp"));
        assert_eq!(session.files().len(), 1);
    }
}
