//! Query language detection

use ukbsearch_config::Language;

/// Share of CJK characters above which a query counts as Chinese
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Classifies a query as Chinese or English by its share of CJK ideographs.
///
/// The ratio is taken over non-whitespace characters and must be strictly
/// greater than the threshold; blank input resolves to Chinese.
#[derive(Debug, Clone, Copy)]
pub struct LanguageDetector {
    threshold: f64,
}

impl LanguageDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn detect(&self, text: &str) -> Language {
        match cjk_ratio(text) {
            None => Language::Chinese,
            Some(ratio) if ratio > self.threshold => Language::Chinese,
            Some(_) => Language::English,
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// CJK share of the non-whitespace characters, `None` for blank text
pub fn cjk_ratio(text: &str) -> Option<f64> {
    let (cjk, total) = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(cjk, total), c| {
            (cjk + usize::from(is_cjk(c)), total + 1)
        });

    if total == 0 {
        None
    } else {
        Some(cjk as f64 / total as f64)
    }
}
