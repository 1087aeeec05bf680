//! Word-document text extraction
//!
//! A `.docx` upload is a ZIP archive whose main content lives in
//! `word/document.xml`. The bytes are staged in a per-request temporary file
//! (removed on every exit path, including failure), the archive is opened
//! from it, and paragraph text is concatenated with newline separators.
//! This branch never calls the model provider.

use crate::core::error::{ApiError, UploadError};
use axum::body::Bytes;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Read, Write};
use tokio::task;
use zip::ZipArchive;

/// Extract paragraph text from `.docx` bytes on the blocking thread pool.
pub async fn paragraph_text(bytes: Bytes) -> Result<String, ApiError> {
    task::spawn_blocking(move || read_paragraphs(&bytes))
        .await
        .map_err(|err| ApiError::Internal(format!("word document task failed: {}", err)))?
}

fn read_paragraphs(bytes: &[u8]) -> Result<String, ApiError> {
    let mut staged = tempfile::NamedTempFile::new()
        .map_err(|err| ApiError::Internal(format!("failed to create temp file: {}", err)))?;
    staged
        .write_all(bytes)
        .map_err(|err| ApiError::Internal(format!("failed to stage upload: {}", err)))?;
    let reopened = staged
        .reopen()
        .map_err(|err| ApiError::Internal(format!("failed to reopen temp file: {}", err)))?;

    let mut archive = ZipArchive::new(reopened).map_err(|err| UploadError::InvalidDocument {
        message: format!("not a readable archive: {}", err),
    })?;
    let mut document =
        archive
            .by_name("word/document.xml")
            .map_err(|err| UploadError::InvalidDocument {
                message: format!("word/document.xml not found: {}", err),
            })?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|err| UploadError::InvalidDocument {
            message: format!("failed to read word/document.xml: {}", err),
        })?;

    collect_paragraphs(&xml)
}

/// Walk `document.xml`, gathering the text runs of each `w:p` paragraph.
///
/// Empty paragraphs are kept so the joined output mirrors the document's
/// visual line structure.
fn collect_paragraphs(xml: &str) -> Result<String, ApiError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Text(e)) => {
                if in_text {
                    current.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"br" | b"cr" => current.push('\n'),
                b"tab" => current.push('\t'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(UploadError::InvalidDocument {
                    message: format!("malformed word/document.xml: {}", err),
                }
                .into());
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn build_docx(document_xml: &str) -> Bytes {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .expect("start_file should succeed");
            writer
                .write_all(document_xml.as_bytes())
                .expect("write should succeed");
            writer.finish().expect("finish should succeed");
        }
        Bytes::from(cursor.into_inner())
    }

    const SAMPLE_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Invoice 2024-17</w:t></w:r><w:r><w:t xml:space="preserve"> for consulting</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Total due: 1200.00</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[tokio::test]
    async fn test_paragraphs_joined_with_newlines() {
        let bytes = build_docx(SAMPLE_DOCUMENT);
        let text = paragraph_text(bytes).await.expect("sample should parse");
        assert_eq!(text, "Invoice 2024-17 for consulting\n\nTotal due: 1200.00");
    }

    #[tokio::test]
    async fn test_runs_concatenate_within_a_paragraph() {
        let xml = r#"<w:document xmlns:w="http://example/w"><w:body>
            <w:p><w:r><w:t>left</w:t></w:r><w:r><w:t>right</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = paragraph_text(build_docx(xml))
            .await
            .expect("should parse");
        assert_eq!(text, "leftright");
    }

    #[tokio::test]
    async fn test_line_break_inside_paragraph() {
        let xml = r#"<w:document xmlns:w="http://example/w"><w:body>
            <w:p><w:r><w:t>above</w:t><w:br/><w:t>below</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = paragraph_text(build_docx(xml))
            .await
            .expect("should parse");
        assert_eq!(text, "above\nbelow");
    }

    #[tokio::test]
    async fn test_entities_are_unescaped() {
        let xml = r#"<w:document xmlns:w="http://example/w"><w:body>
            <w:p><w:r><w:t>Fish &amp; Chips Ltd</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = paragraph_text(build_docx(xml))
            .await
            .expect("should parse");
        assert_eq!(text, "Fish & Chips Ltd");
    }

    #[tokio::test]
    async fn test_not_an_archive_is_an_invalid_document() {
        let err = paragraph_text(Bytes::from_static(b"plainly not a zip"))
            .await
            .expect_err("garbage bytes must fail");
        assert!(matches!(
            err,
            ApiError::Upload(UploadError::InvalidDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_archive_without_document_xml_is_invalid() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            writer
                .start_file("unrelated.txt", SimpleFileOptions::default())
                .expect("start_file should succeed");
            writer
                .write_all(b"hello")
                .expect("write should succeed");
            writer.finish().expect("finish should succeed");
        }

        let err = paragraph_text(Bytes::from(cursor.into_inner()))
            .await
            .expect_err("zip without document.xml must fail");
        assert!(matches!(
            err,
            ApiError::Upload(UploadError::InvalidDocument { .. })
        ));
    }
}
