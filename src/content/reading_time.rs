//! Reading time estimation

use super::ContentBlock;

/// Average reading speed in words per minute
pub const WORDS_PER_MINUTE: usize = 150;

/// Count whitespace-delimited words across headings and fragment texts.
/// Fragments without text contribute nothing.
pub fn count_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            let body: usize = block
                .body
                .iter()
                .filter_map(|fragment| fragment.text.as_deref())
                .map(|text| text.split_whitespace().count())
                .sum();
            block.heading.split_whitespace().count() + body
        })
        .sum()
}

/// Estimated reading time in whole minutes, rounded half away from zero
pub fn estimate(content: &[ContentBlock]) -> u32 {
    let words = count_words(content);
    ((words + WORDS_PER_MINUTE / 2) / WORDS_PER_MINUTE) as u32
}
