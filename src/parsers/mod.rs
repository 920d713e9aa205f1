pub mod html;
pub mod sections;
pub mod text;


pub use html::{extract_metadata, parse_metadata};
pub use sections::{SectionExtractor, parse_sections};
