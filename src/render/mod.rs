//! Rendering module for writing documents and reports out.

mod json;
mod text;

pub use json::{report_to_json, to_json, JsonFormat};
pub use text::{page_text, to_text, to_text_with_options, TextOptions};
