pub mod collection;
pub mod content;

pub use collection::ContentCollection;
pub use content::{
    CONTENT_MAGIC, CONTENT_VERSION, ContentFile, ContentReader, ContentWriter, FileHeader,
    MasterRef,
};
