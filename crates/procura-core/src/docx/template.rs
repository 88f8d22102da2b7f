//! DOCX template filling.
//!
//! Placeholders are written as `{{ field-name }}` anywhere in the document
//! body, headers or footers. Word tends to split typed text over several runs,
//! so markup between the braces is dropped before substitution.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use lazy_static::lazy_static;
use quick_xml::escape::escape;
use regex::{Captures, Regex};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::text::DOCUMENT_PART;
use crate::error::RenderError;
use crate::models::ResolvedContext;
use crate::render::TemplateRenderer;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([\w\-]+)\s*\}\}").unwrap();
    static ref PLACEHOLDER_SPAN: Regex = Regex::new(r"(?s)\{\{.*?\}\}").unwrap();
    static ref SPLIT_OPEN: Regex = Regex::new(r"\{(?:<[^>]*>)+\{").unwrap();
    static ref SPLIT_CLOSE: Regex = Regex::new(r"\}(?:<[^>]*>)+\}").unwrap();
    static ref MARKUP: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref HEADER_FOOTER: Regex = Regex::new(r"^word/(?:header|footer)\d*\.xml$").unwrap();
}

/// Fills `{{ key }}` placeholders of a DOCX template.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxTemplateRenderer;

impl DocxTemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render into an in-memory DOCX package.
    pub fn render_to_vec(&self, template: &Path, context: &ResolvedContext) -> Result<Vec<u8>, RenderError> {
        let invalid = |reason: String| RenderError::Template {
            path: template.to_path_buf(),
            reason,
        };

        let file = File::open(template).map_err(|e| invalid(e.to_string()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for index in 0..archive.len() {
            let name = archive
                .by_index_raw(index)
                .map_err(|e| invalid(e.to_string()))?
                .name()
                .to_string();

            if !is_templated_part(&name) {
                let entry = archive.by_index_raw(index).map_err(|e| invalid(e.to_string()))?;
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| RenderError::Output(e.to_string()))?;
                continue;
            }

            let mut xml = String::new();
            archive
                .by_index(index)
                .map_err(|e| invalid(e.to_string()))?
                .read_to_string(&mut xml)
                .map_err(|e| invalid(format!("{}: {}", name, e)))?;

            debug!("Filling placeholders in {}", name);
            let filled = fill_placeholders(&xml, context)?;

            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| RenderError::Output(e.to_string()))?;
            writer.write_all(filled.as_bytes())?;
        }

        let buffer = writer.finish().map_err(|e| RenderError::Output(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

impl TemplateRenderer for DocxTemplateRenderer {
    fn render(&self, template: &Path, context: &ResolvedContext, output: &Path) -> Result<(), RenderError> {
        let bytes = self.render_to_vec(template, context)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RenderError::Output(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(output, bytes)
            .map_err(|e| RenderError::Output(format!("{}: {}", output.display(), e)))?;

        debug!("Wrote {}", output.display());
        Ok(())
    }
}

fn is_templated_part(name: &str) -> bool {
    name == DOCUMENT_PART || HEADER_FOOTER.is_match(name)
}

/// Placeholder keys in order of appearance, after run merging.
pub fn placeholders(xml: &str) -> Vec<String> {
    let merged = merge_split_placeholders(xml);
    PLACEHOLDER
        .captures_iter(&merged)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitute every placeholder of a WordprocessingML part.
pub fn fill_placeholders(xml: &str, context: &ResolvedContext) -> Result<String, RenderError> {
    let merged = merge_split_placeholders(xml);

    let mut output = String::with_capacity(merged.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(&merged) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = context
            .get(key.as_str())
            .ok_or_else(|| RenderError::MissingKey(key.as_str().to_string()))?;

        output.push_str(&merged[last..whole.start()]);
        output.push_str(&escape(value));
        last = whole.end();
    }
    output.push_str(&merged[last..]);
    Ok(output)
}

/// Join `{{ ... }}` spans that Word split over several runs.
fn merge_split_placeholders(xml: &str) -> String {
    let xml = SPLIT_OPEN.replace_all(xml, "{{");
    let xml = SPLIT_CLOSE.replace_all(&xml, "}}");
    PLACEHOLDER_SPAN
        .replace_all(&xml, |caps: &Captures| MARKUP.replace_all(&caps[0], "").into_owned())
        .into_owned()
}
