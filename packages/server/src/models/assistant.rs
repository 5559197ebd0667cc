use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One prior turn of the chat widget's conversation.
#[derive(Clone, Debug, Deserialize, utoipa::ToSchema)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Copy, Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    /// The visitor's message. Required.
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub message: String,
}

/// Failure shape of the assistant endpoints, kept stable for the widget:
/// a bare `error` string rather than the structured [`crate::error::ErrorBody`].
#[derive(Serialize, utoipa::ToSchema)]
pub struct AssistantError {
    pub error: String,
}

pub const DIFFICULTIES: &[&str] = &["beginner", "intermediate", "advanced", "any"];

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct ProjectGenRequest {
    /// One of `beginner`, `intermediate`, `advanced`, `any`.
    pub difficulty: Option<String>,
    pub category: Option<String>,
    /// Number of ideas to generate (1-12, default 6).
    pub count: Option<usize>,
}

/// One generated portfolio project idea, as emitted by the upstream model.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdea {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub difficulty: String,
    pub estimated_time: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    pub category: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectGenResponse {
    pub ideas: Vec<ProjectIdea>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn validate_projectgen_request(req: &ProjectGenRequest) -> Result<(), AppError> {
    if let Some(ref difficulty) = req.difficulty
        && !DIFFICULTIES.contains(&difficulty.as_str())
    {
        return Err(AppError::Validation(format!(
            "difficulty must be one of: {}",
            DIFFICULTIES.join(", ")
        )));
    }
    if let Some(ref category) = req.category
        && category.trim().chars().count() > 64
    {
        return Err(AppError::Validation(
            "category must be at most 64 characters".into(),
        ));
    }
    Ok(())
}
