//! The fixed, ordered questionnaire.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub index: usize,
    pub text: String,
}

const QUESTIONS: [&str; 8] = [
    "How do you typically react to market volatility, and what actions do you take?",
    "Describe your ideal balance between potential gains and potential losses in your investments.",
    "Have you ever stuck with a familiar investment even if it wasn't performing well? Why?",
    "What influences your confidence in your investment choices, and how often do you re-evaluate them?",
    "Share a time you avoided an investment due to fear. What did you learn?",
    "How do you approach diversification in your investment portfolio?",
    "What would make you change your investment strategy, and how quickly do you adapt to new market conditions?",
    "How do you feel when your investments don't meet your expectations, and what do you do about it?",
];

/// Ordered open-ended questions; each targets one dimension, which is not enforced
#[derive(Debug, Clone)]
pub struct Questionnaire {
    questions: Vec<Question>,
}

impl Questionnaire {
    pub fn standard() -> Self {
        Self::from_texts(QUESTIONS)
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            questions: texts
                .into_iter()
                .enumerate()
                .map(|(index, text)| Question {
                    index,
                    text: text.into(),
                })
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_has_eight_indexed_questions() {
        let q = Questionnaire::standard();
        assert_eq!(q.len(), 8);
        for (i, question) in q.iter().enumerate() {
            assert_eq!(question.index, i);
            assert!(question.text.ends_with('?') || question.text.ends_with('.'));
        }
        assert!(q.get(8).is_none());
    }
}
