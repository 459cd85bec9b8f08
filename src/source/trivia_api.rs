use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::{QuestionSource, RawQuestion, SourceError};
use crate::question::{Difficulty, Question};

pub const DEFAULT_BASE_URL: &str = "https://the-trivia-api.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Questions from the public trivia API.
///
/// Categories are listed by display name; queries use the slugs the API
/// publishes for each name.
pub struct TriviaApiSource {
    client: Client,
    base_url: String,
    slugs: BTreeMap<String, Vec<String>>,
}

impl TriviaApiSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            slugs: BTreeMap::new(),
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, ?query, "trivia api request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "trivia api returned an error status");
            return Err(SourceError::Unavailable(format!("{url} returned {status}")));
        }

        response
            .text()
            .map_err(|e| SourceError::Unavailable(e.to_string()))
    }

    /// The `categories` query value for a display name.
    fn query_value(&self, category: &str) -> String {
        match self.slugs.get(category) {
            Some(slugs) if !slugs.is_empty() => slugs.join(","),
            _ => category.to_string(),
        }
    }
}

pub(crate) fn parse_categories(body: &str) -> Result<BTreeMap<String, Vec<String>>, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Unavailable(format!("bad categories: {e}")))
}

pub(crate) fn parse_question(
    body: &str,
    category: &str,
    difficulty: Difficulty,
) -> Result<Question, SourceError> {
    let raw: Vec<RawQuestion> = serde_json::from_str(body)
        .map_err(|e| SourceError::Unavailable(format!("bad questions: {e}")))?;

    raw.into_iter()
        .next()
        .ok_or_else(|| SourceError::NoQuestionAvailable {
            category: category.to_string(),
            difficulty,
        })?
        .into_question()
}

impl QuestionSource for TriviaApiSource {
    fn list_categories(&mut self) -> Result<Vec<String>, SourceError> {
        let body = self.get("categories", &[])?;
        self.slugs = parse_categories(&body)?;
        Ok(self.slugs.keys().cloned().collect())
    }

    fn next_question(
        &mut self,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<Question, SourceError> {
        let categories = self.query_value(category);
        let difficulty_param = difficulty.to_string();
        let body = self.get(
            "questions",
            &[
                ("categories", categories.as_str()),
                ("difficulty", difficulty_param.as_str()),
                ("limit", "1"),
            ],
        )?;
        parse_question(&body, category, difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORIES: &str = r#"{
        "Arts & Literature": ["arts", "literature", "arts_and_literature"],
        "Science": ["science"]
    }"#;

    const QUESTIONS: &str = r#"[{
        "category": "Science",
        "id": "622a1c367cc59eab6f950215",
        "correctAnswer": "Mercury",
        "incorrectAnswers": ["Venus", "Mars", "Earth"],
        "question": "Which planet is closest to the Sun?",
        "tags": ["science", "space"],
        "type": "Multiple Choice",
        "difficulty": "easy",
        "regions": [],
        "isNiche": false
    }]"#;

    #[test]
    fn test_parse_categories() {
        let slugs = parse_categories(CATEGORIES).unwrap();
        let names: Vec<&String> = slugs.keys().collect();
        assert_eq!(names, vec!["Arts & Literature", "Science"]);
        assert_eq!(slugs["Science"], vec!["science"]);
    }

    #[test]
    fn test_parse_question_ignores_extra_fields() {
        let q = parse_question(QUESTIONS, "Science", Difficulty::Easy).unwrap();
        assert_eq!(q.text(), "Which planet is closest to the Sun?");
        assert_eq!(q.correct_answer(), "Mercury");
        assert_eq!(q.distractors().len(), 3);
        assert_eq!(q.difficulty(), Difficulty::Easy);
    }

    #[test]
    fn test_empty_result_means_no_question() {
        assert_eq!(
            parse_question("[]", "Science", Difficulty::Hard),
            Err(SourceError::NoQuestionAvailable {
                category: "Science".into(),
                difficulty: Difficulty::Hard
            })
        );
    }

    #[test]
    fn test_garbage_body_is_unavailable() {
        assert!(matches!(
            parse_question("<html>", "Science", Difficulty::Easy),
            Err(SourceError::Unavailable(_))
        ));
        assert!(matches!(
            parse_categories("[]"),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_query_value_uses_slugs() {
        let mut source = TriviaApiSource::new("http://localhost:1/api/").unwrap();
        assert_eq!(source.base_url, "http://localhost:1/api");
        assert_eq!(source.query_value("Science"), "Science");

        source.slugs = parse_categories(CATEGORIES).unwrap();
        assert_eq!(
            source.query_value("Arts & Literature"),
            "arts,literature,arts_and_literature"
        );
    }

    #[test]
    fn test_unreachable_host_is_unavailable() {
        let mut source = TriviaApiSource::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            source.list_categories(),
            Err(SourceError::Unavailable(_))
        ));
    }
}
