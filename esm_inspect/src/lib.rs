//! Loads an ordered set of content files and reports what the merged store
//! contains.

pub mod config;
pub mod load;
pub mod report;

pub use config::ContentConfig;
pub use load::{load_content, ProgressLog};
pub use report::{
    diagnostics, dialogue_report, print_summary, write_json, Diagnostics, TopicReport,
};
