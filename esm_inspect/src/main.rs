use anyhow::{bail, Result};
use clap::Parser;
use esm_formats::ContentCollection;
use esm_inspect::{
    diagnostics, dialogue_report, load_content, print_summary, write_json, ContentConfig,
};

mod cli;
use cli::Args;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ContentConfig::from_file(path)?,
        None => ContentConfig::default(),
    };
    config.extend(args.data, args.content);

    let directories = config.data_directories();
    if directories.is_empty() {
        bail!("no existing data directories configured; pass --config or --data");
    }
    let content = config.content_files();
    if content.is_empty() {
        bail!("no content files configured; pass --config or --content");
    }

    let collection = ContentCollection::new(directories, args.fold_case);
    let (store, load) = load_content(&collection, &content)?;

    let report = diagnostics(&store, &load);
    print_summary(&report, args.verbose);

    if let Some(path) = &args.diagnostics_json {
        write_json(path, &report)?;
        println!("Diagnostics written to {}", path.display());
    }
    if let Some(path) = &args.dialogue_report {
        write_json(path, &dialogue_report(&store))?;
        println!("Dialogue merge report written to {}", path.display());
    }

    Ok(())
}
