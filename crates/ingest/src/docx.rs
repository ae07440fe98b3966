//! DOCX decoding.
//!
//! A DOCX file is a ZIP archive; the body lives in `word/document.xml`.
//! Body-level `w:p` elements become paragraphs, `w:tbl/w:tr/w:tc` become
//! table rows and cells. Paragraphs inside a table cell contribute to the
//! cell text only.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::document::{StructuredDocument, Table};
use crate::error::{DecodeError, Result};

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

/// Upper bound on the decompressed `word/document.xml`.
const MAX_DOCUMENT_XML_BYTES: u64 = 200 * 1024 * 1024;

pub fn decode_docx(bytes: &[u8]) -> Result<StructuredDocument> {
    decode_docx_bounded(bytes, MAX_DOCUMENT_XML_BYTES)
}

fn decode_docx_bounded(bytes: &[u8], max_xml_bytes: u64) -> Result<StructuredDocument> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DecodeError::CorruptDocument(format!("failed to open DOCX archive: {}", e)))?;

    let xml = {
        let file = archive.by_name("word/document.xml").map_err(|e| {
            DecodeError::CorruptDocument(format!("missing word/document.xml: {}", e))
        })?;
        let too_large = || {
            DecodeError::CorruptDocument(format!(
                "word/document.xml expands beyond {} bytes",
                max_xml_bytes
            ))
        };
        if file.size() > max_xml_bytes {
            return Err(too_large());
        }

        // The declared size can lie; never inflate more than one byte past the bound.
        let mut content = String::new();
        file.take(max_xml_bytes + 1)
            .read_to_string(&mut content)
            .map_err(|e| {
                DecodeError::CorruptDocument(format!("failed to read document.xml: {}", e))
            })?;
        if content.len() as u64 > max_xml_bytes {
            return Err(too_large());
        }
        content
    };

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<StructuredDocument> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut document = StructuredDocument::default();
    let mut tables: Vec<TableBuilder> = Vec::new();
    let mut paragraph = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => paragraph.clear(),
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"tbl" => tables.push(TableBuilder::default()),
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        table.row.clear();
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        table.cell.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    let text = std::mem::take(&mut paragraph);
                    match tables.last_mut() {
                        Some(table) => table.cell.push(text),
                        None => document.paragraphs.push(text),
                    }
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        let cell = std::mem::take(&mut table.cell).join("\n");
                        table.row.push(cell.trim().to_string());
                    }
                }
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        let row = std::mem::take(&mut table.row);
                        table.rows.push(row);
                    }
                }
                b"tbl" => {
                    if let Some(table) = tables.pop() {
                        document.tables.push(Table { rows: table.rows });
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" if in_run => paragraph.push('\t'),
                b"br" | b"cr" if in_run => paragraph.push('\n'),
                // An empty paragraph still counts as one.
                b"p" => match tables.last_mut() {
                    Some(table) => table.cell.push(String::new()),
                    None => document.paragraphs.push(String::new()),
                },
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text && in_run {
                    let text = e.unescape().map_err(|e| {
                        DecodeError::CorruptDocument(format!("XML text decode error: {}", e))
                    })?;
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DecodeError::CorruptDocument(format!("XML parse error: {}", e)));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(document)
}
