use std::fmt;

/// What the player submitted for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Chosen(String),
    /// The countdown ran out before an answer was given.
    NoAnswer,
}

impl Answer {
    pub fn as_option(&self) -> Option<&str> {
        match self {
            Answer::Chosen(option) => Some(option),
            Answer::NoAnswer => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Chosen(option) => f.write_str(option),
            Answer::NoAnswer => f.write_str("(no answer)"),
        }
    }
}

/// Outcome of one resolved question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_text: String,
    pub selected: Answer,
    pub is_correct: bool,
    pub correct_answer: String,
    pub points_awarded: u32,
    pub seconds_taken: u32,
}

/// Answered questions in the order they were presented.
///
/// Records can only be appended; there is no way to remove, reorder or edit
/// an entry once it is in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerLog {
    records: Vec<AnswerRecord>,
}

impl AnswerLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, record: AnswerRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnswerRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[AnswerRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&AnswerRecord> {
        self.records.last()
    }

    pub fn total_points(&self) -> u64 {
        self.records.iter().map(|r| u64::from(r.points_awarded)).sum()
    }

    pub fn correct_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_correct).count()
    }
}

impl<'a> IntoIterator for &'a AnswerLog {
    type Item = &'a AnswerRecord;
    type IntoIter = std::slice::Iter<'a, AnswerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
