use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::report::store::ResultEntry;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("pdf rendering failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const TITLE_SIZE: i64 = 18;
const BODY_SIZE: i64 = 12;
const BODY_LEADING: i64 = 16;
// Matches the half-inch gap between title and body.
const SPACER: i64 = 36;
const WRAP_COLUMNS: usize = 84;

/// Render the report for one stored result (or the `No Data` document when
/// nothing is stored), write it under `out_path`, and hand the bytes back
/// for download. Rendering is deterministic: the same entry always yields
/// byte-identical output.
pub fn generate(entry: Option<&ResultEntry>, out_path: &Path) -> Result<Vec<u8>, ReportError> {
    let body = match entry {
        Some(entry) if !entry.text.is_empty() => entry.text.as_str(),
        _ => "No Data",
    };

    let bytes = render(body)?;
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_path, &bytes)?;
    Ok(bytes)
}

fn render(body: &str) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let title_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let body_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => title_font_id,
            "F2" => body_font_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), TITLE_SIZE.into()]),
        Operation::new(
            "Td",
            vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN - TITLE_SIZE).into()],
        ),
        Operation::new(
            "Tj",
            vec![Object::string_literal("Animal Health Detection Report")],
        ),
        Operation::new("ET", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), BODY_SIZE.into()]),
        Operation::new("TL", vec![BODY_LEADING.into()]),
        Operation::new(
            "Td",
            vec![
                MARGIN.into(),
                (PAGE_HEIGHT - MARGIN - TITLE_SIZE - SPACER - BODY_SIZE).into(),
            ],
        ),
    ];
    for (i, line) in wrap_text(body, WRAP_COLUMNS).iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Greedy word wrap; a single overlong word gets its own line.
fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn entry(text: &str) -> ResultEntry {
        ResultEntry {
            text: text.to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn report_carries_title_and_stored_text() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report.pdf");
        let stored = entry("Detected: cat, dog | Health Status: Appears Normal");

        let bytes = generate(Some(&stored), &out).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(contains(&bytes, b"Animal Health Detection Report"));
        assert!(contains(&bytes, b"Detected: cat, dog"));
        assert_eq!(std::fs::read(&out).unwrap(), bytes);
    }

    #[test]
    fn missing_entry_renders_no_data() {
        let dir = TempDir::new().unwrap();
        let bytes = generate(None, &dir.path().join("report.pdf")).unwrap();
        assert!(contains(&bytes, b"No Data"));
    }

    #[test]
    fn empty_stored_text_also_renders_no_data() {
        let dir = TempDir::new().unwrap();
        let bytes = generate(Some(&entry("")), &dir.path().join("report.pdf")).unwrap();
        assert!(contains(&bytes, b"No Data"));
    }

    #[test]
    fn rendering_is_byte_identical_across_calls() {
        let dir = TempDir::new().unwrap();
        let stored = entry("Detected in Video: bird | Health Status: Needs Manual Check");
        let first = generate(Some(&stored), &dir.path().join("a.pdf")).unwrap();
        let second = generate(Some(&stored), &dir.path().join("b.pdf")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn wrap_respects_the_column_limit() {
        let text = "word ".repeat(40);
        for line in wrap_text(&text, 20) {
            assert!(line.len() <= 20);
        }
        assert_eq!(wrap_text("", 20), vec![String::new()]);
    }
}
