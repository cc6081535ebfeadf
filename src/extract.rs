//! Per-format text normalization.
//!
//! Each [`FileKind`] has one handler that turns raw file bytes into a single
//! plain-text blob. PDF and DOCX handlers are compiled only with the `pdf`
//! and `docx` features; without them [`extract_text`] returns `Ok(None)` and
//! the loader treats the file as unsupported.

#[cfg(feature = "docx")]
use std::io::Read;

use thiserror::Error;

use crate::models::FileKind;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
#[cfg(feature = "docx")]
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file is not valid UTF-8: {0}")]
    Encoding(String),
    #[error("JSON parse failed: {0}")]
    Json(String),
    #[error("CSV parse failed: {0}")]
    Csv(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Normalize `bytes` according to `kind`.
///
/// Returns `Ok(None)` when the handler for `kind` is not compiled in.
pub fn extract_text(bytes: &[u8], kind: FileKind) -> Result<Option<String>, ExtractError> {
    match kind {
        FileKind::PlainText => decode_utf8(bytes).map(Some),
        FileKind::Json => render_json(&decode_utf8(bytes)?).map(Some),
        FileKind::Csv => render_csv(bytes).map(Some),
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Docx => extract_docx(bytes),
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::Encoding(e.to_string()))
}

/// Objects are pretty-printed; arrays become one compact line per element.
/// A bare string renders unquoted, other scalars as JSON text.
pub fn render_json(text: &str) -> Result<String, ExtractError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ExtractError::Json(e.to_string()))?;
    let rendered = match &value {
        serde_json::Value::Object(_) => serde_json::to_string_pretty(&value),
        serde_json::Value::Array(items) => items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map(|lines| lines.join("\n")),
        serde_json::Value::String(s) => Ok(s.clone()),
        other => Ok(other.to_string()),
    };
    rendered.map_err(|e| ExtractError::Json(e.to_string()))
}

/// Each record becomes `key: value | key: value`, one record per line.
pub fn render_csv(bytes: &[u8]) -> Result<String, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| ExtractError::Csv(e.to_string()))?
        .clone();

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Csv(e.to_string()))?;
        let line = headers
            .iter()
            .enumerate()
            .map(|(i, key)| format!("{}: {}", key, record.get(i).unwrap_or("")))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<Option<String>, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    // pdf-extract separates pages with form feeds.
    Ok(Some(text.replace('\u{c}', "\n")))
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<Option<String>, ExtractError> {
    Ok(None)
}

#[cfg(feature = "docx")]
fn extract_docx(bytes: &[u8]) -> Result<Option<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    extract_paragraphs(&doc_xml).map(Some)
}

#[cfg(not(feature = "docx"))]
fn extract_docx(_bytes: &[u8]) -> Result<Option<String>, ExtractError> {
    Ok(None)
}

/// Collect `<w:t>` runs, one output line per `<w:p>` paragraph.
#[cfg(feature = "docx")]
fn extract_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_read_as_is() {
        let text = extract_text("Vịnh Hạ Long\n\nBãi Cháy".as_bytes(), FileKind::PlainText)
            .unwrap()
            .unwrap();
        assert_eq!(text, "Vịnh Hạ Long\n\nBãi Cháy");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = extract_text(&[0xff, 0xfe, 0x00], FileKind::PlainText).unwrap_err();
        assert!(matches!(err, ExtractError::Encoding(_)));
    }

    #[test]
    fn json_object_is_pretty_printed_in_file_order() {
        let text = render_json(r#"{"name":"Cô Tô","kind":"island"}"#).unwrap();
        assert_eq!(text, "{\n  \"name\": \"Cô Tô\",\n  \"kind\": \"island\"\n}");
    }

    #[test]
    fn json_array_is_one_line_per_element() {
        let text = render_json(r#"[{"a":1},{"b":"Yên Tử"}]"#).unwrap();
        assert_eq!(text, "{\"a\":1}\n{\"b\":\"Yên Tử\"}");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(render_json("{oops"), Err(ExtractError::Json(_))));
    }

    #[test]
    fn json_scalars_render_as_text() {
        assert_eq!(render_json(r#""Vịnh Hạ Long""#).unwrap(), "Vịnh Hạ Long");
        assert_eq!(render_json("42.5").unwrap(), "42.5");
        assert_eq!(render_json("true").unwrap(), "true");
        assert_eq!(render_json("null").unwrap(), "null");
    }

    #[test]
    fn csv_records_render_as_key_value_pairs() {
        let csv = "name,price\nBún bề bề,40000\n\"Chả mực, Hạ Long\",120000\n";
        let text = render_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            text,
            "name: Bún bề bề | price: 40000\nname: Chả mực, Hạ Long | price: 120000"
        );
    }

    #[test]
    fn csv_short_rows_render_empty_values() {
        let text = render_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(text, "a: 1 | b: 2 | c: ");
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", FileKind::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[cfg(feature = "docx")]
    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(b"not a zip", FileKind::Docx).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[cfg(feature = "docx")]
    #[test]
    fn docx_paragraphs_are_newline_separated() {
        let xml = br#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Yen Tu </w:t></w:r><w:r><w:t>pagoda</w:t></w:r></w:p><w:p><w:r><w:t>Tra Co beach</w:t></w:r></w:p></w:body></w:document>"#;
        let text = extract_paragraphs(xml).unwrap();
        assert_eq!(text, "Yen Tu pagoda\nTra Co beach");
    }
}
