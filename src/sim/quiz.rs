//! Quiz question bank

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Options a question may offer
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 3;

/// A multiple-choice question with exactly one correct option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct: usize,
}

impl Question {
    pub fn new(prompt: &str, options: &[&str], correct: usize) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct,
        }
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&self.options.len()) {
            return Err(GameError::config(
                "quiz.questions",
                format!(
                    "\"{}\" has {} options, expected {MIN_OPTIONS}-{MAX_OPTIONS}",
                    self.prompt,
                    self.options.len()
                ),
            ));
        }
        if self.correct >= self.options.len() {
            return Err(GameError::config(
                "quiz.questions",
                format!("\"{}\" marks option {} correct", self.prompt, self.correct),
            ));
        }
        Ok(())
    }
}

/// Built-in neonatal-care questions
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new(
            "What is the normal heart rate range of a newborn?",
            &["80-100 bpm", "120-160 bpm", "180-200 bpm"],
            1,
        ),
        Question::new(
            "When is the APGAR score taken?",
            &["Before birth", "At 1 and 5 minutes", "One hour after birth"],
            1,
        ),
        Question::new(
            "What is a baby's first stool called?",
            &["Colostrum", "Meconium", "Surfactant"],
            1,
        ),
        Question::new(
            "A premature baby is born before which week?",
            &["Week 40", "Week 37", "Week 32"],
            1,
        ),
        Question::new(
            "Why is vitamin K given to newborns?",
            &["For jaundice", "To prevent bleeding", "For immunity"],
            1,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bank_is_valid() {
        let bank = default_questions();
        assert_eq!(bank.len(), 5);
        for question in &bank {
            assert!(question.validate().is_ok());
        }
    }

    #[test]
    fn test_validate_option_bounds() {
        assert!(Question::new("q", &["only"], 0).validate().is_err());
        assert!(Question::new("q", &["a", "b", "c", "d"], 0).validate().is_err());
        assert!(Question::new("q", &["a", "b"], 2).validate().is_err());
        assert!(Question::new("q", &["a", "b"], 1).validate().is_ok());
    }
}
