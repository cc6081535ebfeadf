//! Multi-format corpus loading: every supported kind normalizes to text,
//! broken files are skipped without failing the scan.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use qbot_rag::loader::load_documents;
use qbot_rag::models::FileKind;

fn qbot_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("qbot");
    path
}

/// Minimal single-page PDF with one text run.
/// Body first, then an xref with correct byte offsets so the parser accepts it.
fn minimal_pdf() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(b"4 0 obj << /Length 45 >> stream\nBT /F1 12 Tf 100 700 Td (Yen Tu pagoda) Tj ET\nendstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal DOCX (ZIP) whose `word/document.xml` holds one `<w:p>` per paragraph.
fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn write_config(root: &Path) -> PathBuf {
    let config_path = root.join("qbot.toml");
    let content = format!(
        r#"[corpus]
dir = "{root}/data"

[index]
dir = "{root}/vectorstore"

[embedding]
provider = "hash"

[retrieval]
min_score = 0.1

[llm]
url = "http://127.0.0.1:1/v1/chat/completions"
timeout_secs = 2
"#,
        root = root.display()
    );
    fs::write(&config_path, content).unwrap();
    config_path
}

fn run_qbot(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = qbot_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run qbot binary at {:?}: {}", binary, e));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn every_text_format_is_normalized() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a_notes.md"), "# Hạ Long\n\nKarst islands.").unwrap();
    fs::write(
        dir.join("b_food.csv"),
        "dish,price\nChả mực,120000\nSá sùng,300000\n",
    )
    .unwrap();
    fs::write(
        dir.join("c_places.json"),
        r#"[{"name":"Cô Tô"},{"name":"Quan Lạn"}]"#,
    )
    .unwrap();
    fs::write(dir.join("d_guide.docx"), minimal_docx(&["Yen Tu", "Tra Co"])).unwrap();

    let docs = load_documents(dir).unwrap();
    let kinds: Vec<FileKind> = docs.iter().map(|d| d.file_kind).collect();
    assert_eq!(
        kinds,
        vec![FileKind::PlainText, FileKind::Csv, FileKind::Json, FileKind::Docx]
    );
    assert_eq!(docs[0].raw_text, "# Hạ Long\n\nKarst islands.");
    assert_eq!(
        docs[1].raw_text,
        "dish: Chả mực | price: 120000\ndish: Sá sùng | price: 300000"
    );
    assert_eq!(docs[2].raw_text, "{\"name\":\"Cô Tô\"}\n{\"name\":\"Quan Lạn\"}");
    assert_eq!(docs[3].raw_text, "Yen Tu\nTra Co");
}

#[test]
fn corrupt_binary_files_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("bad.pdf"), b"not a valid pdf").unwrap();
    fs::write(dir.join("bad.docx"), b"not a zip").unwrap();
    fs::write(dir.join("good.txt"), "Bãi Cháy beach.").unwrap();

    let docs = load_documents(dir).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source_label(), "good.txt");
}

#[test]
fn minimal_pdf_never_fails_the_scan() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("guide.pdf"), minimal_pdf()).unwrap();
    fs::write(dir.join("notes.txt"), "Tuần Châu marina.").unwrap();

    // Depending on font handling the PDF may yield no text and be skipped;
    // either way the scan succeeds and the text file is loaded.
    let docs = load_documents(dir).unwrap();
    assert!(docs.iter().any(|d| d.source_label() == "notes.txt"));
    assert!(docs.len() <= 2);
}

#[test]
fn docx_content_is_searchable_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(
        root.join("data").join("pagodas.docx"),
        minimal_docx(&["Yen Tu pagoda sits on a mountain", "Cable cars run daily"]),
    )
    .unwrap();
    let config_path = write_config(root);

    let (stdout, stderr, success) = run_qbot(&config_path, &["build"]);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("1 documents"), "{}", stdout);

    let (search_out, _, success) = run_qbot(&config_path, &["search", "Yen Tu pagoda"]);
    assert!(success);
    assert!(
        search_out.contains("pagodas.docx") && search_out.contains("Yen Tu pagoda"),
        "search should return the docx paragraph, got: {}",
        search_out
    );
}
