//! Output document rendering.

use std::path::Path;

use crate::error::RenderError;
use crate::models::ResolvedContext;

pub use crate::docx::DocxTemplateRenderer;

/// Produces a finished document from a template and a resolved context.
pub trait TemplateRenderer {
    /// Render `template` with `context` and write the result to `output`,
    /// creating missing parent directories.
    fn render(&self, template: &Path, context: &ResolvedContext, output: &Path) -> Result<(), RenderError>;
}
