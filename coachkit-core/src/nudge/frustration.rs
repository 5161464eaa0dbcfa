//! Keyword detection for the `task_stuck` trigger.

use crate::types::Locale;

const EN_KEYWORDS: &[&str] = &[
    "can't",
    "cannot",
    "stuck",
    "don't understand",
    "too big",
    "don't know where to start",
    "overwhelmed",
];

const FR_KEYWORDS: &[&str] = &[
    "je n'arrive pas",
    "bloqué",
    "bloquée",
    "je comprends pas",
    "je ne comprends pas",
    "trop gros",
    "par où commencer",
    "dépassé",
    "dépassée",
];

/// Matches a user message against the locale's frustration keywords.
#[derive(Debug, Clone, Copy)]
pub struct FrustrationDetector {
    locale: Locale,
}

impl FrustrationDetector {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self.locale {
            Locale::En => EN_KEYWORDS,
            Locale::Fr => FR_KEYWORDS,
        }
    }

    /// First keyword found in `text`, case-insensitively.
    pub fn detect(&self, text: &str) -> Option<&'static str> {
        // Typographic apostrophes are common on mobile keyboards
        let normalized = text.to_lowercase().replace('\u{2019}', "'");
        self.keywords()
            .iter()
            .copied()
            .find(|keyword| normalized.contains(keyword))
    }

    pub fn is_frustrated(&self, text: &str) -> bool {
        self.detect(text).is_some()
    }
}

impl Default for FrustrationDetector {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_keywords() {
        let detector = FrustrationDetector::new(Locale::En);
        assert_eq!(detector.detect("I'm STUCK on this report"), Some("stuck"));
        assert_eq!(detector.detect("I can\u{2019}t focus"), Some("can't"));
        assert!(detector.is_frustrated("It's too big, I don't know where to start"));
        assert!(!detector.is_frustrated("Let's plan my morning"));
    }

    #[test]
    fn test_no_match_inside_other_words() {
        let detector = FrustrationDetector::new(Locale::En);
        assert_eq!(detector.detect("Made significant progress today"), None);
        assert_eq!(detector.detect("Buying a cantaloupe, then decant the wine"), None);
        assert_eq!(detector.detect("I just can't"), Some("can't"));
    }

    #[test]
    fn test_french_keywords() {
        let detector = FrustrationDetector::new(Locale::Fr);
        assert!(detector.is_frustrated("Je suis complètement Bloquée"));
        assert!(detector.is_frustrated("Je n\u{2019}arrive pas à m'y mettre"));
        assert!(detector.is_frustrated("je sais pas par où commencer"));
        assert!(!detector.is_frustrated("On planifie la journée ?"));
    }
}
