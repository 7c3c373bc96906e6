use anyhow::{Context, Result};
use esm_formats::{ContentCollection, ContentFile};
use esm_store::{LoadListener, LoadReport, LoadSession, RecordStore};
use log::{debug, info};

/// Logs which content file is being read and how far along it is.
#[derive(Debug, Default)]
pub struct ProgressLog {
    label: String,
    total: usize,
    done: usize,
}

impl LoadListener for ProgressLog {
    fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
        self.total = 0;
        self.done = 0;
        info!("reading {label}");
    }

    fn set_progress_range(&mut self, total: usize) {
        self.total = total;
    }

    fn increase_progress(&mut self, amount: usize) {
        self.done += amount;
        if self.total > 0 && self.done == self.total {
            debug!("{}: {} of {} records", self.label, self.done, self.total);
        }
    }
}

/// Resolve every content name through the data directories and apply the
/// files in order, then finalize the store.
pub fn load_content(
    collection: &ContentCollection,
    content: &[&str],
) -> Result<(RecordStore, LoadReport)> {
    let mut store = RecordStore::new();
    let mut session = LoadSession::with_listener(&mut store, ProgressLog::default());

    for name in content {
        let path = collection
            .get_path(name)
            .with_context(|| format!("locating content file {name}"))?;
        let file = ContentFile::open(&path)?;
        if !file.header().masters.is_empty() {
            let masters: Vec<&str> = file
                .header()
                .masters
                .iter()
                .map(|m| m.name.as_str())
                .collect();
            debug!("{name} depends on {}", masters.join(", "));
        }
        let mut records = file.records();
        session
            .apply(&mut records)
            .with_context(|| format!("aborting content load at {name}"))?;
    }

    let report = session.finish();
    Ok((store, report))
}
