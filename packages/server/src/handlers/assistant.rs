use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, instrument};

use crate::extractors::json::AppJson;
use crate::genai::strip_code_fence;
use crate::models::assistant::{
    AssistantError, ChatRequest, ChatResponse, ChatRole, ChatTurn, ProjectGenRequest,
    ProjectGenResponse, ProjectIdea, validate_projectgen_request,
};
use crate::state::AppState;

/// Turns of history forwarded upstream; older ones are dropped to stay
/// within token limits.
const HISTORY_LIMIT: usize = 10;

const DEFAULT_IDEA_COUNT: usize = 6;
const MAX_IDEA_COUNT: usize = 12;

const CHAT_SYSTEM_PROMPT: &str = "\
You are the virtual assistant for this developer portfolio website.

## Response Guidelines:
- Keep responses concise (2-4 sentences typically)
- Be helpful, professional, and enthusiastic about tech
- For specific project questions, suggest visiting the Projects page (/projects)
- For collaboration or job inquiries, direct visitors to the Contact page (/contact)
- Never pretend to be a human - you're an AI assistant
- For personal questions not covered here, politely redirect to professional topics";

const IDEA_CATEGORIES: &[&str] = &[
    "Web Application",
    "Mobile App",
    "CLI Tool",
    "API/Backend",
    "Full Stack",
    "DevOps/Automation",
    "AI/ML Project",
    "Game Development",
    "Browser Extension",
];

#[utoipa::path(
    post,
    path = "/chat",
    tag = "Assistant",
    operation_id = "chat",
    summary = "Chat with the portfolio assistant",
    description = "Proxies the visitor's message (plus up to the last 10 turns of history) to \
        the generative-language upstream. Failures never leak upstream detail: clients get \
        `{ \"error\": ... }` with a generic message.",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Missing message", body = AssistantError),
        (status = 500, description = "Upstream unconfigured or failed", body = AssistantError),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChatRequest>,
) -> Response {
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let Some(message) = message else {
        return (
            StatusCode::BAD_REQUEST,
            Json(AssistantError {
                error: "Message is required".into(),
            }),
        )
            .into_response();
    };

    let prompt = build_chat_prompt(message, &payload.history);
    match state.genai.generate(&prompt).await {
        Ok(text) => Json(ChatResponse { message: text }).into_response(),
        Err(e) => {
            error!("chat upstream failure: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AssistantError {
                    error: "Failed to generate a response. Please try again.".into(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/projectgen",
    tag = "Assistant",
    operation_id = "generateProjectIdeas",
    summary = "Generate portfolio project ideas",
    description = "Asks the upstream model for a JSON array of project ideas. A wrapping \
        Markdown code fence in the upstream output is stripped before parsing. On upstream \
        or parse failure the response is `{ \"error\": ..., \"ideas\": [] }` with status 500.",
    request_body = ProjectGenRequest,
    responses(
        (status = 200, description = "Generated ideas", body = ProjectGenResponse),
        (status = 400, description = "Invalid request", body = AssistantError),
        (status = 500, description = "Upstream or parse failure", body = ProjectGenResponse),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn generate_project_ideas(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProjectGenRequest>,
) -> Response {
    if let Err(e) = validate_projectgen_request(&payload) {
        return e.into_response();
    }

    let prompt = build_ideas_prompt(&payload);
    let ideas = match state.genai.generate(&prompt).await {
        Ok(text) => parse_ideas(&text),
        Err(e) => Err(format!("upstream failure: {e:?}")),
    };

    match ideas {
        Ok(ideas) => Json(ProjectGenResponse { ideas, error: None }).into_response(),
        Err(detail) => {
            error!("projectgen failure: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProjectGenResponse {
                    ideas: Vec::new(),
                    error: Some(
                        "Failed to generate project ideas. Please try again.".into(),
                    ),
                }),
            )
                .into_response()
        }
    }
}

fn build_chat_prompt(message: &str, history: &[ChatTurn]) -> String {
    let mut prompt = String::from(CHAT_SYSTEM_PROMPT);

    let start = history.len().saturating_sub(HISTORY_LIMIT);
    let recent = &history[start..];
    if !recent.is_empty() {
        prompt.push_str("\n\n## Previous Conversation:\n");
        for turn in recent {
            let speaker = match turn.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            prompt.push_str(speaker);
            prompt.push_str(": ");
            prompt.push_str(&turn.content);
            prompt.push('\n');
        }
    }

    prompt.push_str("\n## Current User Message:\nUser: ");
    prompt.push_str(message);
    prompt.push_str("\n\nAssistant:");
    prompt
}

fn build_ideas_prompt(options: &ProjectGenRequest) -> String {
    let count = options
        .count
        .unwrap_or(DEFAULT_IDEA_COUNT)
        .clamp(1, MAX_IDEA_COUNT);
    let difficulty = options.difficulty.as_deref().unwrap_or("any");
    let category = options.category.as_deref().unwrap_or("").trim();

    let mut prompt = format!(
        "You are an expert software engineering mentor creating portfolio-worthy project ideas.\n\n\
         Generate {count} unique project ideas that are:\n\
         - Practical and implementable\n\
         - Good for building a developer portfolio\n\
         - Clear in scope and requirements\n"
    );
    if difficulty != "any" {
        prompt.push_str(&format!("- Suitable for {difficulty} level developers\n"));
    }
    if !category.is_empty() {
        prompt.push_str(&format!("- In the {category} category\n"));
    }
    prompt.push_str(&format!(
        "\nFor each project, provide a JSON object with these exact fields:\n\
         - id: A unique kebab-case identifier (e.g., \"task-tracker-pro\")\n\
         - title: Creative, memorable project name\n\
         - summary: 1-2 sentence elevator pitch\n\
         - description: 2-3 paragraphs explaining the project, its purpose, and potential users\n\
         - difficulty: Exactly one of \"beginner\", \"intermediate\", or \"advanced\"\n\
         - estimatedTime: Realistic completion estimate (e.g., \"2-3 weeks\")\n\
         - technologies: Array of 4-6 recommended technologies\n\
         - features: Array of 4-6 specific features to implement\n\
         - learningOutcomes: Array of 3-5 skills/concepts the developer will learn\n\
         - category: One of: {}\n\n\
         IMPORTANT: Respond with only a valid JSON array. No markdown, no code blocks, no additional text.\n\
         Example: [{{\"id\": \"project-1\", \"title\": \"...\"}}]",
        IDEA_CATEGORIES.join(", ")
    ));
    prompt
}

fn parse_ideas(text: &str) -> Result<Vec<ProjectIdea>, String> {
    let cleaned = strip_code_fence(text);
    serde_json::from_str(cleaned).map_err(|e| format!("malformed ideas payload: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: ChatRole, content: &str) -> ChatTurn {
        ChatTurn {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn history_is_truncated_to_the_last_ten_turns() {
        let history: Vec<ChatTurn> = (0..15)
            .map(|i| turn(ChatRole::User, &format!("turn {i}")))
            .collect();
        let prompt = build_chat_prompt("hello", &history);
        assert!(!prompt.contains("turn 4"));
        assert!(prompt.contains("turn 5"));
        assert!(prompt.contains("turn 14"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn empty_history_omits_the_section() {
        let prompt = build_chat_prompt("hello", &[]);
        assert!(!prompt.contains("Previous Conversation"));
        assert!(prompt.contains("User: hello"));
    }

    #[test]
    fn ideas_parse_through_a_code_fence() {
        let text = "```json\n[{\"id\":\"a\",\"title\":\"A\",\"summary\":\"s\",\
                    \"description\":\"d\",\"difficulty\":\"beginner\",\
                    \"estimatedTime\":\"1 week\",\"category\":\"CLI Tool\"}]\n```";
        let ideas = parse_ideas(text).unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].id, "a");
    }

    #[test]
    fn non_array_payload_is_an_error() {
        assert!(parse_ideas("{\"ideas\": []}").is_err());
    }

    #[test]
    fn ideas_prompt_respects_options() {
        let prompt = build_ideas_prompt(&ProjectGenRequest {
            difficulty: Some("beginner".into()),
            category: Some("CLI Tool".into()),
            count: Some(3),
        });
        assert!(prompt.contains("Generate 3 unique project ideas"));
        assert!(prompt.contains("beginner level developers"));
        assert!(prompt.contains("In the CLI Tool category"));
    }
}
