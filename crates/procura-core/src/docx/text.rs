//! Plain text of a Word document.

use std::io::{Read, Seek};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

/// Main document part inside the package.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Read the text of a DOCX package.
///
/// Body paragraphs come first, joined with newlines. The text of every cell of
/// the top-level tables follows, each cell prefixed by one space. Paragraphs
/// inside a cell belong to that cell.
pub fn docx_text<R: Read + Seek>(source: R) -> Result<String, String> {
    let mut archive = ZipArchive::new(source).map_err(|e| format!("not a DOCX package: {}", e))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| format!("missing {}: {}", DOCUMENT_PART, e))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable {}: {}", DOCUMENT_PART, e))?;

    document_text(&xml)
}

/// Text of a `word/document.xml` part. See [`docx_text`] for the layout.
pub fn document_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut cell_paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut table_depth = 0usize;
    let mut paragraph_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed XML at {}: {}", reader.buffer_position(), e))?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    paragraph_depth += 1;
                    if paragraph_depth == 1 {
                        current.clear();
                    }
                }
                b"tbl" => table_depth += 1,
                b"tc" if table_depth == 1 => cell_paragraphs.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if paragraph_depth == 0 => {
                    push_paragraph(String::new(), table_depth, &mut paragraphs, &mut cell_paragraphs)
                }
                b"tab" if paragraph_depth == 1 => current.push('\t'),
                b"br" | b"cr" if paragraph_depth == 1 => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text && paragraph_depth == 1 => {
                let text = t.unescape().map_err(|e| format!("bad text: {}", e))?;
                current.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    if paragraph_depth == 1 {
                        push_paragraph(
                            std::mem::take(&mut current),
                            table_depth,
                            &mut paragraphs,
                            &mut cell_paragraphs,
                        );
                    }
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                }
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"tc" if table_depth == 1 => cells.push(cell_paragraphs.join("\n")),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let mut text = paragraphs.join("\n");
    for cell in cells {
        text.push(' ');
        text.push_str(&cell);
    }
    Ok(text)
}

fn push_paragraph(
    paragraph: String,
    table_depth: usize,
    paragraphs: &mut Vec<String>,
    cell_paragraphs: &mut Vec<String>,
) {
    match table_depth {
        0 => paragraphs.push(paragraph),
        1 => cell_paragraphs.push(paragraph),
        // nested tables are not part of the outer cell text
        _ => {}
    }
}
