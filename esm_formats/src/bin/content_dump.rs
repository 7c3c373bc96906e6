use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use esm_formats::ContentFile;
use esm_stream::{FLAG_DELETED, FLAG_REQUIRED, RecordSource};

#[derive(Parser, Debug)]
#[command(about = "List the records stored in a content file", version)]
struct Args {
    /// Content file to inspect
    file: PathBuf,

    /// Only list records with this four-character tag (case-insensitive)
    #[arg(long, value_name = "TAG")]
    tag: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let content = ContentFile::open(&args.file)?;
    let header = content.header();
    println!(
        "{} records in {}",
        content.record_count(),
        content.path().display()
    );
    if !header.author.is_empty() {
        println!("author: {}", header.author);
    }
    if !header.description.is_empty() {
        println!("description: {}", header.description);
    }
    for master in &header.masters {
        println!("master: {} ({} bytes)", master.name, master.size);
    }

    let mut reader = content.records();
    let mut index = 0usize;
    while let Some(record) = reader
        .next_record()
        .with_context(|| format!("reading record {index}"))?
    {
        index += 1;
        let tag = record.tag.to_string();
        if let Some(filter) = args.tag.as_deref() {
            if !tag.eq_ignore_ascii_case(filter) {
                continue;
            }
        }
        let mut markers = String::new();
        if record.flags & FLAG_DELETED != 0 {
            markers.push('D');
        }
        if record.flags & FLAG_REQUIRED != 0 {
            markers.push('R');
        }
        println!(
            "{index:>6} {tag:<4} {flags:#06x} {markers:<2} {size:>8}",
            flags = record.flags,
            size = record.payload.len()
        );
    }
    Ok(())
}
