use std::path::Path;

use anyhow::{Context, Result};
use esm_formats::{ContentCollection, ContentFile, ContentWriter, FileHeader, MasterRef};
use esm_store::{Apparatus, Dialogue, DialogueInfo, DialogueType, LoadSession, Record, RecordStore};
use tempfile::tempdir;

fn header(description: &str, masters: &[&str]) -> FileHeader {
    FileHeader {
        author: "fixtures".into(),
        description: description.into(),
        masters: masters
            .iter()
            .map(|name| MasterRef {
                name: name.to_string(),
                size: 0,
            })
            .collect(),
    }
}

fn write_apparatus(dir: &Path, name: &str, deleted: bool, model: &str) -> Result<()> {
    let mut writer = ContentWriter::new(header(name, &["Morrowind.esm"]));
    writer.push(
        Apparatus::TAG,
        deleted,
        &Apparatus {
            id: "foobar".into(),
            model: model.into(),
            ..Apparatus::default()
        },
    )?;
    writer.write_to(dir.join(name))
}

fn load_in_order(collection: &ContentCollection, names: &[&str]) -> Result<RecordStore> {
    let mut store = RecordStore::new();
    let mut session = LoadSession::new(&mut store);
    for name in names {
        let path = collection.get_path(name)?;
        let file = ContentFile::open(&path)?;
        let mut records = file.records();
        session
            .apply(&mut records)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    session.finish();
    Ok(store)
}

#[test]
fn three_file_apparatus_scenario_from_disk() -> Result<()> {
    let dir = tempdir()?;
    write_apparatus(dir.path(), "Morrowind.esm", false, "first.nif")?;
    write_apparatus(dir.path(), "Delete.esp", true, "")?;
    write_apparatus(dir.path(), "Revive.esp", false, "the_new_model")?;

    let collection = ContentCollection::new(vec![dir.path().to_path_buf()], true);
    let store = load_in_order(&collection, &["Morrowind.esm", "delete.esp", "Revive.esp"])?;

    let apparatus = store.get::<Apparatus>();
    assert_eq!(apparatus.len(), 1);
    assert_eq!(apparatus.search("foobar").unwrap().model, "the_new_model");
    Ok(())
}

#[test]
fn dialogue_written_to_disk_merges_on_load() -> Result<()> {
    let dir = tempdir()?;

    let mut master = ContentWriter::new(header("master", &[]));
    master.push(Dialogue::TAG, false, &Dialogue::new("Greeting 1", DialogueType::Greeting))?;
    master.push(DialogueInfo::TAG, false, &DialogueInfo::new("100", "Hello, outlander."))?;
    master.write_to(dir.path().join("Master.esm"))?;

    let mut plugin = ContentWriter::new(header("plugin", &["Master.esm"]));
    plugin.push(Dialogue::TAG, false, &Dialogue::new("greeting 1", DialogueType::Greeting))?;
    plugin.push(DialogueInfo::TAG, true, &DialogueInfo::new("100", ""))?;
    plugin.push(DialogueInfo::TAG, false, &DialogueInfo::new("200", "Welcome back."))?;
    plugin.write_to(dir.path().join("Plugin.esp"))?;

    let collection = ContentCollection::new(vec![dir.path().to_path_buf()], true);
    let store = load_in_order(&collection, &["Master.esm", "Plugin.esp"])?;

    let topic = store.get::<Dialogue>().get("Greeting 1")?;
    let ids: Vec<&str> = topic.infos().map(|info| info.id.as_str()).collect();
    assert_eq!(ids, vec!["200"]);
    Ok(())
}

#[test]
fn missing_content_file_is_reported_by_name() {
    let dir = tempdir().unwrap();
    let collection = ContentCollection::new(vec![dir.path().to_path_buf()], true);
    let err = load_in_order(&collection, &["Absent.esp"]).unwrap_err();
    assert!(err.to_string().contains("Absent.esp"));
}
