//! Fixed-size word chunking of page text.
//!
//! Pages are split on whitespace into word tokens and regrouped into
//! consecutive, non-overlapping windows. Windows may fall mid-sentence;
//! semantic boundary awareness is deliberately out of scope.

use crate::types::{Chunk, PageText};

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Split `text` into chunks of up to `chunk_size` words each.
///
/// Words are whatever `split_whitespace` yields, in order; each window is
/// rejoined with single spaces, so runs of whitespace in the input collapse.
/// The final window may be shorter. Deterministic: the same `(text,
/// chunk_size)` always produces the same sequence. Empty or whitespace-only
/// text yields an empty sequence.
pub fn split_text(text: &str, chunk_size: usize) -> Vec<String> {
    // A zero-word window would never advance; treat it as one word per chunk.
    let chunk_size = chunk_size.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_size)
        .map(|window| window.join(" "))
        .collect()
}

/// Chunk one page into embedding-ready [`Chunk`]s carrying its page number.
pub fn chunk_page(page: &PageText, chunk_size: usize) -> Vec<Chunk> {
    split_text(&page.text, chunk_size)
        .into_iter()
        .map(|text| Chunk {
            text,
            source_page: page.number,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 300).is_empty());
        assert!(split_text("   \n\t  ", 300).is_empty());
    }

    #[test]
    fn short_text_yields_one_chunk_equal_to_the_whole_text() {
        let text = words(299);
        let chunks = split_text(&text, 300);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn text_longer_than_window_splits_into_ordered_windows() {
        let chunks = split_text(&words(350), 300);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 300);
        assert_eq!(chunks[1].split_whitespace().count(), 50);
        assert!(chunks[0].starts_with("w0 "));
        assert!(chunks[1].starts_with("w300 "));
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = words(1000);
        assert_eq!(split_text(&text, 300), split_text(&text, 300));
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        let chunks = split_text("alpha\n\nbeta\t gamma", 300);
        assert_eq!(chunks, vec!["alpha beta gamma".to_string()]);
    }

    #[test]
    fn chunk_page_carries_the_source_page_number() {
        let page = PageText::new(7, words(350));
        let chunks = chunk_page(&page, 300);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.source_page == 7));
    }
}
