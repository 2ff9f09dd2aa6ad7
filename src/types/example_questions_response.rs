use serde::{Deserialize, Serialize};

/// Body returned by `GET /examples`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleQuestionsResponse {
    /// Suggested questions.
    pub questions: Vec<String>,
}
