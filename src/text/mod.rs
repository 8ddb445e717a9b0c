pub mod clean;
pub mod extract;
mod richtext;

pub use clean::{clean_text, normalize_whitespace, strip_html, strip_markdown};
pub use extract::{document_from_story, extract_text, ExtractOptions};
