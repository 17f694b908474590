// WHY: All skip arithmetic runs over a letters-only buffer, while highlighting needs the
// original offsets, so stripping and the offset map are produced together in one pass

use std::sync::OnceLock;
use tracing::debug;

use crate::error::{ElsError, Result};
use crate::matcher::LetterIndex;

/// Classifies a source character as a letter (kept) or noise (dropped)
pub type LetterPredicate = fn(char) -> bool;

/// Case handling applied to kept letters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    /// Keep letters exactly as they appear in the source
    Preserve,
    /// Compare letters case-insensitively by lowercasing them
    #[default]
    Lower,
}

/// Configuration for letter stripping
#[derive(Debug, Clone, Copy)]
pub struct NormalizerConfig {
    pub case: CaseMode,
    /// Map Hebrew final forms (sofit) onto their regular letters
    pub fold_final_forms: bool,
    pub predicate: LetterPredicate,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            case: CaseMode::Lower,
            fold_final_forms: false,
            predicate: char::is_alphabetic,
        }
    }
}

impl NormalizerConfig {
    /// Fold a single kept letter according to this configuration
    /// WHY: one source letter must always yield exactly one buffer letter, otherwise
    /// the position map would stop being one-to-one
    pub fn fold_letter(&self, ch: char) -> char {
        let ch = if self.fold_final_forms {
            fold_final_form(ch)
        } else {
            ch
        };

        match self.case {
            CaseMode::Preserve => ch,
            CaseMode::Lower => {
                let mut lower = ch.to_lowercase();
                match (lower.next(), lower.next()) {
                    (Some(single), None) => single,
                    _ => ch,
                }
            }
        }
    }

    pub fn is_letter(&self, ch: char) -> bool {
        (self.predicate)(ch)
    }
}

/// Map a Hebrew final letter to its regular form
pub fn fold_final_form(ch: char) -> char {
    match ch {
        '\u{05DA}' => '\u{05DB}', // final kaf
        '\u{05DD}' => '\u{05DE}', // final mem
        '\u{05DF}' => '\u{05E0}', // final nun
        '\u{05E3}' => '\u{05E4}', // final pe
        '\u{05E5}' => '\u{05E6}', // final tsadi
        other => other,
    }
}

/// Letters-only projection of a source text with a map back to source byte offsets
#[derive(Debug)]
pub struct StrippedText {
    letters: Vec<char>,
    raw_letters: Vec<char>,
    position_map: Vec<usize>,
    source_len: usize,
    config: NormalizerConfig,
    index: OnceLock<LetterIndex>,
}

impl StrippedText {
    /// Strip `source` down to its letters using `config`
    pub fn new(source: &str, config: NormalizerConfig) -> Self {
        let mut letters = Vec::with_capacity(source.len());
        let mut raw_letters = Vec::with_capacity(source.len());
        let mut position_map = Vec::with_capacity(source.len());

        for (offset, ch) in source.char_indices() {
            if !config.is_letter(ch) {
                continue;
            }
            letters.push(config.fold_letter(ch));
            raw_letters.push(ch);
            position_map.push(offset);
        }

        letters.shrink_to_fit();
        raw_letters.shrink_to_fit();
        position_map.shrink_to_fit();

        debug!(
            "Stripped {} source bytes down to {} letters",
            source.len(),
            letters.len()
        );

        Self {
            letters,
            raw_letters,
            position_map,
            source_len: source.len(),
            config,
            index: OnceLock::new(),
        }
    }

    /// Letters used for matching (after case and final-form folding)
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Letters exactly as they appear in the source, for display
    pub fn raw_letters(&self) -> &[char] {
        &self.raw_letters
    }

    /// `position_map()[i]` is the byte offset of letter `i` in the source
    pub fn position_map(&self) -> &[usize] {
        &self.position_map
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Length in bytes of the source this buffer was stripped from
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Source byte offset of letter `index`
    pub fn source_offset(&self, index: usize) -> Option<usize> {
        self.position_map.get(index).copied()
    }

    /// Source byte range covered by letter `index`
    pub fn source_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        let start = self.source_offset(index)?;
        let width = self.raw_letters.get(index)?.len_utf8();
        Some(start..start + width)
    }

    /// Per-character position index, built on first use and shared afterwards
    pub fn letter_index(&self) -> &LetterIndex {
        self.index.get_or_init(|| LetterIndex::build(&self.letters))
    }

    /// Apply this buffer's letter rules to a search term
    pub fn normalize_term(&self, term: &str) -> Result<String> {
        let normalized: String = term
            .chars()
            .filter(|&ch| self.config.is_letter(ch))
            .map(|ch| self.config.fold_letter(ch))
            .collect();

        if normalized.is_empty() {
            return Err(ElsError::invalid(
                "term",
                format!("{term:?} contains no letters"),
            ));
        }
        Ok(normalized)
    }
}

/// Strip `source` with the default configuration
pub fn normalize(source: &str) -> StrippedText {
    StrippedText::new(source, NormalizerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_punctuation_and_spaces() {
        let stripped = normalize("In the beginning, God.");
        let letters: String = stripped.letters().iter().collect();
        assert_eq!(letters, "inthebeginninggod");
        assert_eq!(stripped.len(), 17);
        assert_eq!(stripped.position_map()[0], 0);
        assert_eq!(stripped.position_map()[2], 3);
    }

    #[test]
    fn test_position_map_round_trip() {
        let source = "Ab, c!\n d—é f";
        let stripped = normalize(source);

        for (i, &offset) in stripped.position_map().iter().enumerate() {
            let ch = source[offset..].chars().next().unwrap();
            assert_eq!(ch, stripped.raw_letters()[i]);
            assert_eq!(stripped.config().fold_letter(ch), stripped.letters()[i]);
        }
        assert!(stripped.position_map().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_preserve_case() {
        let config = NormalizerConfig {
            case: CaseMode::Preserve,
            ..Default::default()
        };
        let stripped = StrippedText::new("aB c", config);
        assert_eq!(stripped.letters(), &['a', 'B', 'c']);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert!(normalize("").is_empty());
        let stripped = normalize("... 123 !?");
        assert!(stripped.is_empty());
        assert_eq!(stripped.source_len(), 10);
    }

    #[test]
    fn test_final_form_folding() {
        let config = NormalizerConfig {
            fold_final_forms: true,
            ..Default::default()
        };
        // shalom, ending in final mem
        let stripped = StrippedText::new("שלום", config);
        assert_eq!(stripped.letters()[3], '\u{05DE}');
        assert_eq!(stripped.raw_letters()[3], '\u{05DD}');
    }

    #[test]
    fn test_expanding_lowercase_kept_single() {
        let config = NormalizerConfig::default();
        // 'İ' lowercases to two chars; it must stay one letter
        assert_eq!(config.fold_letter('\u{0130}'), '\u{0130}');
        assert_eq!(config.fold_letter('Q'), 'q');
    }

    #[test]
    fn test_source_range_multibyte() {
        let source = "é!b";
        let stripped = normalize(source);
        assert_eq!(stripped.source_range(0), Some(0..2));
        assert_eq!(stripped.source_range(1), Some(3..4));
        assert_eq!(stripped.source_range(2), None);
    }

    #[test]
    fn test_normalize_term() {
        let stripped = normalize("text");
        assert_eq!(stripped.normalize_term("To-Rah").unwrap(), "torah");
        let err = stripped.normalize_term(" 42 ").unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(stripped.normalize_term("").is_err());
    }

    #[test]
    fn test_letter_index_is_cached() {
        let stripped = normalize("abcabc");
        let first = stripped.letter_index() as *const LetterIndex;
        let second = stripped.letter_index() as *const LetterIndex;
        assert_eq!(first, second);
        assert_eq!(stripped.letter_index().positions('b'), &[1, 4]);
    }
}
