use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use esm_store::{DanglingReference, Dialogue, FileLoadStats, LoadReport, RecordStore};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct KindDiagnostics {
    pub tag: String,
    pub kind: &'static str,
    pub count: usize,
    /// Live ids in store iteration order.
    pub ids: Vec<String>,
}

/// Everything the store ended up with, per kind.
#[derive(Debug, Serialize)]
pub struct Diagnostics {
    pub files: Vec<FileLoadStats>,
    pub kinds: Vec<KindDiagnostics>,
    pub dangling: Vec<DanglingReference>,
}

/// A topic and its merged info ids.
#[derive(Debug, Serialize)]
pub struct TopicReport {
    pub id: String,
    pub infos: Vec<String>,
}

pub fn diagnostics(store: &RecordStore, load: &LoadReport) -> Diagnostics {
    let kinds = store
        .kinds()
        .into_iter()
        .map(|summary| KindDiagnostics {
            tag: summary.tag.to_string(),
            kind: summary.kind,
            count: summary.live,
            ids: store
                .ids_of(summary.tag)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .collect();

    Diagnostics {
        files: load.files.clone(),
        kinds,
        dangling: store.indices().dangling.clone(),
    }
}

pub fn dialogue_report(store: &RecordStore) -> Vec<TopicReport> {
    store
        .get::<Dialogue>()
        .iter()
        .map(|topic| TopicReport {
            id: topic.id.clone(),
            infos: topic.infos().map(|info| info.id.clone()).collect(),
        })
        .collect()
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing report for {}", path.display()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn print_summary(diagnostics: &Diagnostics, verbose: bool) {
    println!("Content files:");
    for file in &diagnostics.files {
        print!(
            "  #{} {}: {} loaded, {} deleted",
            file.index, file.name, file.loaded, file.deleted
        );
        if file.infos > 0 {
            print!(", {} infos", file.infos);
        }
        if file.skipped > 0 {
            print!(", {} skipped", file.skipped);
        }
        if !file.overrides.is_empty() {
            let sources: Vec<String> = file
                .overrides
                .iter()
                .map(|(index, count)| format!("{count} from #{index}"))
                .collect();
            print!(", overrides {}", sources.join(", "));
        }
        println!();
    }

    println!();
    for kind in &diagnostics.kinds {
        if kind.count == 0 && !verbose {
            continue;
        }
        println!("{} {} ({}) records", kind.count, kind.kind, kind.tag);
        if verbose {
            for id in &kind.ids {
                println!("  {id}");
            }
        }
    }

    if !diagnostics.dangling.is_empty() {
        println!();
        println!("Dangling references: {}", diagnostics.dangling.len());
        for reference in &diagnostics.dangling {
            println!(
                "  {} {} -> {}",
                reference.owner_kind, reference.owner, reference.target
            );
        }
    }
}
