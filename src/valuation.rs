// WHY: The numeric system is injected by the caller; the engine only defines how
// the term and the skip magnitude are fed to it and how the two values combine

use serde::Serialize;

use crate::result::{ElsResult, ElsSearchSummary};

/// Numeric valuation of a term or a decimal skip string
pub trait ValueFn: Sync {
    fn value(&self, text: &str) -> i64;
}

impl<F> ValueFn for F
where
    F: Fn(&str) -> i64 + Sync,
{
    fn value(&self, text: &str) -> i64 {
        self(text)
    }
}

/// Values attached to a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Valuation {
    pub term_value: i64,
    pub skip_value: i64,
    /// Always `term_value + skip_value`
    pub total_value: i64,
}

impl Valuation {
    pub fn new(term_value: i64, skip_value: i64) -> Self {
        Self {
            term_value,
            skip_value,
            total_value: term_value.saturating_add(skip_value),
        }
    }
}

/// String handed to the value function for a skip: its magnitude in decimal
pub fn skip_encoding(skip: i64) -> String {
    skip.unsigned_abs().to_string()
}

/// Compute and attach values to one hit
pub fn annotate(result: &mut ElsResult, value_fn: &dyn ValueFn) {
    let term_value = value_fn.value(&result.term);
    let skip_value = value_fn.value(&skip_encoding(result.skip));
    result.valuation = Some(Valuation::new(term_value, skip_value));
}

/// Annotate every hit in a summary
pub fn annotate_summary(summary: &mut ElsSearchSummary, value_fn: &dyn ValueFn) {
    for result in &mut summary.results {
        annotate(result, value_fn);
    }
}

/// Hits whose total value lies within `tolerance` of `target`; unvalued hits never match
pub fn filter_by_value(summary: &ElsSearchSummary, target: i64, tolerance: u64) -> ElsSearchSummary {
    summary.retain_cloned(|result| {
        result
            .total_value()
            .is_some_and(|total| total.abs_diff(target) <= tolerance)
    })
}

/// Built-in letter-value tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calculator {
    /// a = 1 through z = 26
    EnglishOrdinal,
    /// English ordinal times six
    EnglishSumerian,
    /// Hebrew standard values (mispar hechrechi), finals valued as their regular forms
    HebrewStandard,
}

impl Calculator {
    /// Sum of letter values; each run of ASCII digits adds its decimal value
    pub fn value(&self, text: &str) -> i64 {
        let mut total: i64 = 0;
        let mut number: Option<i64> = None;

        for ch in text.chars() {
            if let Some(digit) = ch.to_digit(10) {
                let current = number.unwrap_or(0);
                number = Some(current.saturating_mul(10).saturating_add(i64::from(digit)));
                continue;
            }
            if let Some(n) = number.take() {
                total = total.saturating_add(n);
            }
            total = total.saturating_add(self.letter_value(ch));
        }

        total.saturating_add(number.unwrap_or(0))
    }

    pub fn letter_value(&self, ch: char) -> i64 {
        match self {
            Calculator::EnglishOrdinal => english_ordinal(ch),
            Calculator::EnglishSumerian => english_ordinal(ch) * 6,
            Calculator::HebrewStandard => hebrew_standard(ch),
        }
    }
}

fn english_ordinal(ch: char) -> i64 {
    let lower = ch.to_ascii_lowercase();
    if lower.is_ascii_lowercase() {
        i64::from(lower as u8 - b'a' + 1)
    } else {
        0
    }
}

fn hebrew_standard(ch: char) -> i64 {
    match crate::normalizer::fold_final_form(ch) {
        'א' => 1,
        'ב' => 2,
        'ג' => 3,
        'ד' => 4,
        'ה' => 5,
        'ו' => 6,
        'ז' => 7,
        'ח' => 8,
        'ט' => 9,
        'י' => 10,
        'כ' => 20,
        'ל' => 30,
        'מ' => 40,
        'נ' => 50,
        'ס' => 60,
        'ע' => 70,
        'פ' => 80,
        'צ' => 90,
        'ק' => 100,
        'ר' => 200,
        'ש' => 300,
        'ת' => 400,
        _ => 0,
    }
}
