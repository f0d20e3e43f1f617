use super::*;

fn reconstruct(chunks: &[String], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(chunk);
        } else {
            text.extend(chunk.chars().skip(overlap));
        }
    }
    text
}

#[test]
fn empty_text_yields_no_chunks() {
    let config = ChunkingConfig::default();
    assert!(chunk_text("", &config).is_empty());
}

#[test]
fn short_text_yields_single_chunk() {
    let config = ChunkingConfig::default();
    let chunks = chunk_text("short text", &config);
    assert_eq!(chunks, vec!["short text".to_string()]);
}

#[test]
fn text_of_exact_chunk_size() {
    let config = ChunkingConfig {
        chunk_size: 10,
        chunk_overlap: 3,
    };
    let chunks = chunk_text("abcdefghij", &config);
    assert_eq!(chunks, vec!["abcdefghij".to_string()]);
}

#[test]
fn chunks_respect_size_and_overlap() {
    let config = ChunkingConfig {
        chunk_size: 10,
        chunk_overlap: 4,
    };
    let text = "abcdefghijklmnopqrstuvwxyz";
    let chunks = chunk_text(text, &config);

    for (i, chunk) in chunks.iter().enumerate() {
        if i < chunks.len() - 1 {
            assert_eq!(chunk.chars().count(), 10);
        } else {
            assert!(chunk.chars().count() <= 10);
        }
    }

    // Consecutive chunks share exactly `chunk_overlap` characters
    for pair in chunks.windows(2) {
        let tail: String = pair[0].chars().skip(10 - 4).collect();
        let head: String = pair[1].chars().take(4).collect();
        assert_eq!(tail, head);
    }
}

#[test]
fn coverage_reconstructs_input() {
    let config = ChunkingConfig {
        chunk_size: 12,
        chunk_overlap: 5,
    };
    let text = "The quick brown fox jumps over the lazy dog, twice around the yard.";
    let chunks = chunk_text(text, &config);

    assert_eq!(reconstruct(&chunks, config.chunk_overlap), text);
}

#[test]
fn chunk_count_close_to_estimate() {
    let config = ChunkingConfig {
        chunk_size: 50,
        chunk_overlap: 10,
    };
    let text = "x".repeat(1234);
    let chunks = chunk_text(&text, &config);

    let estimate = 1234_usize.div_ceil(config.chunk_size - config.chunk_overlap);
    assert!(chunks.len().abs_diff(estimate) <= 1);
}

#[test]
fn chunking_is_deterministic() {
    let config = ChunkingConfig {
        chunk_size: 20,
        chunk_overlap: 5,
    };
    let text = "Splits allow dividing work items. ".repeat(10);

    assert_eq!(chunk_text(&text, &config), chunk_text(&text, &config));
}

#[test]
fn multibyte_input_splits_on_char_boundaries() {
    let config = ChunkingConfig {
        chunk_size: 4,
        chunk_overlap: 1,
    };
    let text = "héllo wörld ünïcode";
    let chunks = chunk_text(text, &config);

    assert_eq!(reconstruct(&chunks, config.chunk_overlap), text);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 4);
    }
}
