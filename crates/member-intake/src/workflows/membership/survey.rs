use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::ApplicantIdentity;

/// Keywords that abort a survey at any step.
pub const CANCEL_KEYWORDS: [&str; 2] = ["/cancel", "cancel"];

/// One survey question: a stable answer key plus the prompt shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyQuestion {
    pub key: &'static str,
    pub prompt: &'static str,
}

/// Fixed ordered list of question keys collected during submission.
#[derive(Debug, Clone)]
pub struct SurveyDefinition {
    questions: Vec<SurveyQuestion>,
}

impl SurveyDefinition {
    pub fn new(questions: Vec<SurveyQuestion>) -> Self {
        Self { questions }
    }

    /// The community membership survey.
    pub fn standard() -> Self {
        Self::new(vec![
            SurveyQuestion {
                key: "full_name",
                prompt: "What is your name?",
            },
            SurveyQuestion {
                key: "age",
                prompt: "How old are you?",
            },
            SurveyQuestion {
                key: "time",
                prompt: "How much time per week can you dedicate to the community?",
            },
            SurveyQuestion {
                key: "experience",
                prompt: "Share a link to examples of your work.",
            },
            SurveyQuestion {
                key: "goals",
                prompt: "Why do you want to join, and how can you help?",
            },
        ])
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, index: usize) -> Option<&SurveyQuestion> {
        self.questions.get(index)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.questions.iter().map(|question| question.key)
    }

    pub fn prompt_at(&self, index: usize) -> Option<QuestionPrompt> {
        self.question(index).map(|question| QuestionPrompt {
            index,
            key: question.key.to_string(),
            prompt: question.prompt.to_string(),
        })
    }
}

/// What the front-end should ask next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionPrompt {
    pub index: usize,
    pub key: String,
    pub prompt: String,
}

/// Per-applicant conversational scratch state.
///
/// Absent session = not started; the session is dropped on cancel or completion,
/// so partial answers never outlive the exchange and never reach the store.
#[derive(Debug, Clone)]
pub struct SurveySession {
    identity: ApplicantIdentity,
    question_index: usize,
    answers: BTreeMap<String, String>,
}

/// Result of recording one answer against a session.
#[derive(Debug)]
pub enum SessionProgress {
    /// More questions remain; carry the advanced session forward.
    Next(SurveySession),
    /// Every survey key has an answer; the session is complete.
    Complete {
        identity: ApplicantIdentity,
        answers: BTreeMap<String, String>,
    },
}

impl SurveySession {
    pub fn start(identity: ApplicantIdentity) -> Self {
        Self {
            identity,
            question_index: 0,
            answers: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> &ApplicantIdentity {
        &self.identity
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    /// Records an answer for the current question and advances.
    pub fn record_answer(self, survey: &SurveyDefinition, text: String) -> SessionProgress {
        let mut answers = self.answers;
        if let Some(question) = survey.question(self.question_index) {
            answers.insert(question.key.to_string(), text);
        }

        let next = self.question_index + 1;
        if next >= survey.len() {
            SessionProgress::Complete {
                identity: self.identity,
                answers,
            }
        } else {
            SessionProgress::Next(Self {
                identity: self.identity,
                question_index: next,
                answers,
            })
        }
    }

    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }
}

/// True when the applicant typed a cancel keyword instead of an answer.
pub fn is_cancel_text(text: &str) -> bool {
    let normalized = text.trim().to_ascii_lowercase();
    CANCEL_KEYWORDS.iter().any(|keyword| normalized == *keyword)
}
