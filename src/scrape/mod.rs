mod content;
mod structure;

pub use content::{content_html, ContentRetriever, ResponseFilter};
pub use structure::{LessonDescriptor, StructureDiscoverer};
