//! Text extraction from raw document bytes.
//!
//! Dispatches on the document's extension to one of a fixed set of
//! strategies. Every strategy returns non-empty text or an error; empty
//! documents never reach the chunker.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use super::error::{ExtractError, ExtractResult};
use super::types::{Document, DocumentFormat};

/// Zip entry holding the main body of a DOCX file.
const DOCX_BODY_PART: &str = "word/document.xml";

/// Stateless text extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract plain text from a document, inferring the format from its name.
    pub fn extract(&self, document: &Document) -> ExtractResult<String> {
        let format = document
            .format()
            .ok_or_else(|| ExtractError::unsupported(&document.name))?;

        tracing::debug!(
            target: "extract",
            "extracting {} ({format}, {} bytes)",
            document.name,
            document.size()
        );

        let text = match format {
            DocumentFormat::Pdf => extract_pdf(&document.name, &document.bytes)?,
            DocumentFormat::Docx => extract_docx(&document.name, &document.bytes)?,
            DocumentFormat::PlainText | DocumentFormat::Markdown => {
                decode_utf8(&document.name, &document.bytes)?
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::failed(&document.name, "no text extracted"));
        }

        Ok(text.to_string())
    }
}

fn decode_utf8(name: &str, bytes: &[u8]) -> ExtractResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ExtractError::failed(name, format!("invalid UTF-8: {e}")))
}

fn extract_pdf(name: &str, bytes: &[u8]) -> ExtractResult<String> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::failed(name, format!("PDF error: {e}"))),
        Err(_) => Err(ExtractError::failed(name, "PDF parser panicked")),
    }
}

fn extract_docx(name: &str, bytes: &[u8]) -> ExtractResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::failed(name, format!("not a DOCX archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| ExtractError::failed(name, format!("missing {DOCX_BODY_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::failed(name, format!("unreadable {DOCX_BODY_PART}: {e}")))?;

    docx_xml_to_text(&xml).map_err(|reason| ExtractError::failed(name, reason))
}

/// Flatten WordprocessingML into text, one line per paragraph.
fn docx_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let unescaped = t.unescape().map_err(|e| format!("bad XML text: {e}"))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed XML at position {}: {e}",
                    reader.error_position()
                ));
            }
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(body_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file(DOCX_BODY_PART, options).unwrap();
        writer.write_all(body_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Lease Agreement</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">The tenant </w:t></w:r><w:r><w:t>&amp; the landlord agree.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Rent</w:t><w:tab/><w:t>1000</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_plain_text_and_markdown() {
        let extractor = Extractor::new();
        let text = extractor
            .extract(&Document::new("notes.txt", b"  hello world \n".to_vec()))
            .unwrap();
        assert_eq!(text, "hello world");

        let md = extractor
            .extract(&Document::new("README.MD", b"# Title\n\nBody".to_vec()))
            .unwrap();
        assert_eq!(md, "# Title\n\nBody");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice("Café".as_bytes());
        let text = Extractor::new()
            .extract(&Document::new("bom.txt", bytes))
            .unwrap();
        assert_eq!(text, "Café");
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let err = Extractor::new()
            .extract(&Document::new("bad.txt", vec![0xff, 0xfe, 0x00]))
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let extractor = Extractor::new();
        for name in ["legacy.doc", "image.png", "no_extension"] {
            let err = extractor
                .extract(&Document::new(name, b"data".to_vec()))
                .unwrap_err();
            assert!(
                matches!(err, ExtractError::UnsupportedFormat { .. }),
                "{name} should be unsupported"
            );
        }
    }

    #[test]
    fn test_whitespace_only_text_fails() {
        let err = Extractor::new()
            .extract(&Document::new("blank.md", b" \n\n\t".to_vec()))
            .unwrap_err();
        assert_eq!(
            err,
            ExtractError::ExtractionFailed {
                name: "blank.md".to_string(),
                reason: "no text extracted".to_string(),
            }
        );
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let text = Extractor::new()
            .extract(&Document::new("lease.docx", docx_bytes(BODY)))
            .unwrap();
        assert_eq!(
            text,
            "Lease Agreement\nThe tenant & the landlord agree.\nRent\t1000"
        );
    }

    #[test]
    fn test_docx_without_body_fails() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = Extractor::new()
            .extract(&Document::new("broken.docx", bytes))
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_docx_not_a_zip_fails() {
        let err = Extractor::new()
            .extract(&Document::new("fake.docx", b"plain text".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_malformed_pdf_fails() {
        let err = Extractor::new()
            .extract(&Document::new("scan.pdf", b"%PDF-1.4 garbage".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
    }
}
