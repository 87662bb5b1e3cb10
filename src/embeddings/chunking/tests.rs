use super::*;
use std::path::PathBuf;

fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
        chunk_size,
        chunk_overlap,
    }
}

fn texts<'a>(text: &'a str, ranges: &[Range<usize>]) -> Vec<&'a str> {
    ranges
        .iter()
        .map(|r| text.get(r.clone()).expect("range should be on char boundaries"))
        .collect()
}

#[test]
fn short_text_is_a_single_chunk() {
    let text = "Hello world.";
    let ranges = split_text(text, &ChunkingConfig::default());
    assert_eq!(ranges, vec![0..12]);
}

#[test]
fn blank_text_has_no_chunks() {
    assert!(split_text("", &ChunkingConfig::default()).is_empty());
    assert!(split_text("  \n\n \n", &ChunkingConfig::default()).is_empty());
}

#[test]
fn prefers_paragraph_boundaries() {
    let text = format!("{}\n\n{}", "A".repeat(60), "B".repeat(60));
    let ranges = split_text(&text, &config(100, 0));

    assert_eq!(texts(&text, &ranges), vec!["A".repeat(60), "B".repeat(60)]);
    assert_eq!(ranges[1].start, 62);
}

#[test]
fn long_text_is_bounded_and_overlapping() {
    let text = "word ".repeat(500);
    let ranges = split_text(&text, &config(100, 20));

    assert!(ranges.len() > 1);
    for chunk in texts(&text, &ranges) {
        assert!(chunk.chars().count() <= 100);
        assert_eq!(chunk, chunk.trim());
    }
    for pair in ranges.windows(2) {
        assert!(pair[1].start < pair[0].end, "adjacent chunks should overlap");
        assert!(pair[1].start > pair[0].start);
    }
}

#[test]
fn falls_back_to_character_splits() {
    let text = "é".repeat(150);
    let ranges = split_text(&text, &config(100, 0));

    let lengths: Vec<usize> = texts(&text, &ranges)
        .iter()
        .map(|chunk| chunk.chars().count())
        .collect();
    assert_eq!(lengths, vec![100, 50]);
    assert_eq!(ranges[1].start, 200);
}

#[test]
fn chunking_is_deterministic() {
    let text = "Curcumin supports joint health.\nTake one scoop daily.\n\n".repeat(40);
    let first = split_text(&text, &config(200, 40));
    let second = split_text(&text, &config(200, 40));
    assert_eq!(first, second);
}

#[test]
fn chunk_document_carries_provenance() {
    let document = Document {
        source: PathBuf::from("docs/fibre-feel.pdf"),
        page_number: 3,
        text: format!("{}\n\n{}", "Fibre ".repeat(30), "Feel ".repeat(30)),
    };

    let chunks = chunk_document(&document, &config(120, 10));

    assert!(chunks.len() >= 2);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
        assert_eq!(chunk.page_number, 3);
        assert_eq!(chunk.source, "docs/fibre-feel.pdf");
        assert_eq!(
            document
                .text
                .get(chunk.offset..chunk.offset + chunk.text.len()),
            Some(chunk.text.as_str())
        );
    }
}

#[test]
fn chunk_documents_preserves_order() {
    let documents = vec![
        Document {
            source: PathBuf::from("docs/a.pdf"),
            page_number: 1,
            text: "First page".to_string(),
        },
        Document {
            source: PathBuf::from("docs/a.pdf"),
            page_number: 2,
            text: "Second page".to_string(),
        },
    ];

    let chunks = chunk_documents(&documents, &ChunkingConfig::default());
    let pages: Vec<u32> = chunks.iter().map(|c| c.page_number).collect();
    assert_eq!(pages, vec![1, 2]);
    assert_eq!(chunks[1].text, "Second page");
}
