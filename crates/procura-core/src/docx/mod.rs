//! Word (DOCX) documents: text reading and template filling.

mod template;
mod text;

pub use template::{DocxTemplateRenderer, fill_placeholders, placeholders};
pub use text::{DOCUMENT_PART, document_text, docx_text};
