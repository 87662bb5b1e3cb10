use super::*;
use crate::recipe::pdf::PdfBuilder;
use tempfile::TempDir;

fn write_pdf(path: &Path, pages: &[&str]) {
    let mut builder = PdfBuilder::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            builder.new_page();
        }
        builder.paragraph(page);
    }
    let bytes = builder.finish().expect("should build fixture pdf");
    fs::write(path, bytes).expect("should write fixture pdf");
}

#[test]
fn lists_only_visible_pdf_files() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path();
    write_pdf(&dir.join("b.pdf"), &["b"]);
    write_pdf(&dir.join("A.PDF"), &["a"]);
    write_pdf(&dir.join(".hidden.pdf"), &["hidden"]);
    fs::write(dir.join("notes.txt"), "not a pdf").expect("should write file");
    fs::create_dir(dir.join("nested.pdf")).expect("should create dir");

    let files = list_pdf_files(dir).expect("should list files");
    let names: Vec<_> = files
        .iter()
        .filter_map(|f| f.file_name().and_then(|n| n.to_str()))
        .collect();
    assert_eq!(names, vec!["A.PDF", "b.pdf"]);
}

#[test]
fn missing_directory_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = list_pdf_files(&temp_dir.path().join("missing"));
    assert!(matches!(result, Err(RagError::Document(_))));
}

#[test]
fn loads_one_document_per_page() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("curcumin.pdf");
    write_pdf(
        &path,
        &[
            "Curcumin Unlocked supports joint comfort.",
            "Take one capsule daily with food.",
        ],
    );

    let documents = load_pdf(&path).expect("should load pdf");

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].page_number, 1);
    assert_eq!(documents[1].page_number, 2);
    assert!(documents[0].text.contains("joint comfort"));
    assert!(documents[1].text.contains("one capsule daily"));
    assert!(documents.iter().all(|d| d.source == path));
}

#[test]
fn pages_without_text_are_skipped() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("k2drops.pdf");
    write_pdf(&path, &["K2Drops front label.", "", "Shake well before use."]);

    let documents = load_pdf(&path).expect("should load pdf");

    let pages: Vec<u32> = documents.iter().map(|d| d.page_number).collect();
    assert_eq!(pages, vec![1, 3]);
}

#[test]
fn load_directory_concatenates_files_in_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    write_pdf(&temp_dir.path().join("b.pdf"), &["second file"]);
    write_pdf(&temp_dir.path().join("a.pdf"), &["first file"]);

    let documents = load_directory(temp_dir.path()).expect("should load directory");
    assert_eq!(documents.len(), 2);
    assert!(documents[0].text.contains("first file"));
    assert!(documents[1].text.contains("second file"));
}

#[test]
fn corrupt_pdf_is_a_document_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("broken.pdf");
    fs::write(&path, b"%PDF-1.5 this is not really a pdf").expect("should write file");

    assert!(matches!(load_pdf(&path), Err(RagError::Document(_))));
}
