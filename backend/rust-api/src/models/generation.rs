//! Shape of a generated course as returned by the text generation API.
//!
//! Every field is optional or defaulted: the model is asked for a fixed
//! structure but the pipeline fills gaps instead of rejecting the payload.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedPayload {
    pub course: GeneratedCourse,
    pub lessons: Vec<GeneratedLesson>,
    pub quiz: GeneratedQuiz,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratedCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub estimated_duration: Option<String>,
    pub learning_objectives: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratedLesson {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub order: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    pub points: Option<u32>,
    pub duration: Option<String>,
    pub video_search_term: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratedQuiz {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Vec<GeneratedQuestion>,
    #[serde(deserialize_with = "lenient_u32")]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    /// Some generations use `answer` instead of `correctAnswer`
    pub answer: Option<String>,
    pub explanation: Option<String>,
}

impl GeneratedQuestion {
    pub fn resolved_answer(&self) -> String {
        self.correct_answer
            .clone()
            .or_else(|| self.answer.clone())
            .unwrap_or_default()
    }
}

/// Accepts `3`, `"3"` or `null`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
