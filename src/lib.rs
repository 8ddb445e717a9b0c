pub mod cms;
pub mod core;
pub mod http;
pub mod search;
pub mod text;

// --- Primary core exports ---
pub use core::types;
pub use core::types::*;
pub use core::AppState;

pub use cms::{CmsClient, ContentSource, FetchError, StaticSource};
pub use search::SearchIndex;
pub use text::{clean_text, document_from_story, extract_text, ExtractOptions};
