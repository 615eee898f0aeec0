//! Eligibility form: questions derived from the summary, one answer each.
//!
//! The question list is never stored. It is recomputed from the current
//! `SummaryResult` whenever it is needed, and the answer list is resized to
//! match before anything reads it. That keeps the two from drifting apart
//! when a new upload brings a different number of questions.

use serde::{Deserialize, Serialize};

use crate::backend::SummaryResult;
use crate::error::StageError;

/// A yes/no answer, serialized as `"Yes"` / `"No"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    Yes,
    #[default]
    No,
}

impl Answer {
    /// Parse user input such as `yes`, `Y`, `no`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Some(Self::Yes),
            "no" | "n" => Some(Self::No),
            _ => None,
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Yes => "Yes",
            Self::No => "No",
        };
        write!(f, "{s}")
    }
}

/// Split the raw question block into questions, dropping blank lines.
pub fn derive_questions(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Questions for a summary, or none when there is no summary.
pub fn questions_for(summary: Option<&SummaryResult>) -> Vec<String> {
    derive_questions(summary.and_then(|s| s.eligibility_questions_raw.as_deref()))
}

/// Answer state for the current question set.
#[derive(Debug, Clone, Default)]
pub struct EligibilityForm {
    answers: Vec<Answer>,
}

impl EligibilityForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to `question_count`, resetting every answer to `No` if the
    /// count changed.
    pub fn sync(&mut self, question_count: usize) {
        if self.answers.len() != question_count {
            self.answers = vec![Answer::default(); question_count];
        }
    }

    /// Reset every answer to `No` for `question_count` questions.
    pub fn reset(&mut self, question_count: usize) {
        self.answers = vec![Answer::default(); question_count];
    }

    /// Set one answer. `question_count` is the current derived count.
    pub fn set_answer(
        &mut self,
        question_count: usize,
        index: usize,
        value: Answer,
    ) -> Result<(), StageError> {
        self.sync(question_count);
        let slot = self.answers.get_mut(index).ok_or_else(|| {
            StageError::Validation(format!(
                "Question {} does not exist; there are {question_count} questions.",
                index + 1
            ))
        })?;
        *slot = value;
        Ok(())
    }

    /// Answers aligned with `question_count` questions.
    pub fn answers(&mut self, question_count: usize) -> &[Answer] {
        self.sync(question_count);
        &self.answers
    }
}

/// What the UI renders for the eligibility stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub questions: Vec<String>,
    pub answers: Vec<Answer>,
}

impl FormView {
    /// The form is only presented when there is at least one question.
    pub fn is_presented(&self) -> bool {
        !self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_drops_blank_lines() {
        let questions = derive_questions(Some("Are you a farmer?\n\n   \nDo you own land?\n"));
        assert_eq!(questions, ["Are you a farmer?", "Do you own land?"]);
    }

    #[test]
    fn handles_crlf() {
        let questions = derive_questions(Some("Q1?\r\nQ2?\r\n\r\n"));
        assert_eq!(questions, ["Q1?", "Q2?"]);
    }

    #[test]
    fn empty_or_blank_yields_no_questions() {
        assert!(derive_questions(None).is_empty());
        assert!(derive_questions(Some("")).is_empty());
        assert!(derive_questions(Some(" \n\t\n  ")).is_empty());
    }

    #[test]
    fn derivation_is_idempotent() {
        let summary = SummaryResult {
            success: true,
            eligibility_questions_raw: Some("A?\nB?\n\nC?".into()),
            ..Default::default()
        };
        assert_eq!(questions_for(Some(&summary)), questions_for(Some(&summary)));
        assert!(questions_for(None).is_empty());
    }

    #[test]
    fn answers_default_to_no_and_follow_length() {
        let mut form = EligibilityForm::new();
        assert_eq!(form.answers(2), [Answer::No, Answer::No]);

        form.set_answer(2, 1, Answer::Yes).unwrap();
        assert_eq!(form.answers(2), [Answer::No, Answer::Yes]);

        // A different question count throws the old answers away.
        assert_eq!(form.answers(3), [Answer::No, Answer::No, Answer::No]);
        assert!(form.answers(0).is_empty());
    }

    #[test]
    fn set_answer_is_bounds_checked() {
        let mut form = EligibilityForm::new();
        let err = form.set_answer(2, 2, Answer::Yes).unwrap_err();
        assert!(matches!(err, StageError::Validation(_)));
        assert_eq!(form.answers(2), [Answer::No, Answer::No]);

        assert!(form.set_answer(0, 0, Answer::Yes).is_err());
    }

    #[test]
    fn reset_clears_same_length_answers() {
        let mut form = EligibilityForm::new();
        form.set_answer(1, 0, Answer::Yes).unwrap();
        form.reset(1);
        assert_eq!(form.answers(1), [Answer::No]);
    }

    #[test]
    fn answer_parse_and_display() {
        assert_eq!(Answer::parse("YES"), Some(Answer::Yes));
        assert_eq!(Answer::parse(" n "), Some(Answer::No));
        assert_eq!(Answer::parse("maybe"), None);
        assert_eq!(Answer::Yes.to_string(), "Yes");
        assert_eq!(serde_json::to_string(&Answer::No).unwrap(), "\"No\"");
    }

    #[test]
    fn form_view_presence() {
        let view = FormView {
            questions: vec![],
            answers: vec![],
        };
        assert!(!view.is_presented());
    }
}
