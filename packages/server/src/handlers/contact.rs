use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::{contact, mail};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::contact::{ContactRequest, ContactResponse, validate_contact};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Contact",
    operation_id = "submitContactForm",
    summary = "Submit the contact form",
    description = "Stores the submission and enqueues a notification row for the external \
        mail dispatcher. The notification is fire-and-forget: if it cannot be enqueued the \
        submission still succeeds.",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Submission stored", body = ContactResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(name = %payload.name))]
pub async fn submit_contact(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_contact(&payload)?;

    let now = Utc::now();
    let submission = contact::ActiveModel {
        id: Set(Uuid::now_v7()),
        name: Set(payload.name.trim().to_string()),
        email: Set(payload.email.trim().to_string()),
        message: Set(payload.message.trim().to_string()),
        submitted_at: Set(now),
    };
    let saved = submission.insert(&state.db).await?;

    if !state.config.mail.notify_to.is_empty() {
        let notification = mail::ActiveModel {
            id: Set(Uuid::now_v7()),
            to: Set(state.config.mail.notify_to.clone()),
            subject: Set(format!("Portfolio Contact Form: {}", saved.name)),
            text_body: Set(mail_text(&saved.name, &saved.email, &saved.message, now)),
            html_body: Set(mail_html(&saved.name, &saved.email, &saved.message, now)),
            created_at: Set(now),
        };
        if let Err(e) = mail::Entity::insert(notification)
            .exec_without_returning(&state.db)
            .await
        {
            tracing::warn!(error = %e, "failed to enqueue contact notification mail");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            id: saved.id.to_string(),
        }),
    ))
}

fn mail_text(name: &str, email: &str, message: &str, at: DateTime<Utc>) -> String {
    format!(
        "New contact form submission:\n\n\
         Name: {name}\n\
         Email: {email}\n\n\
         Message:\n{message}\n\n\
         ---\n\
         Submitted at: {at}\n",
        at = at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn mail_html(name: &str, email: &str, message: &str, at: DateTime<Utc>) -> String {
    format!(
        "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">\
           <h2>New Contact Form Submission</h2>\
           <p><strong>Name:</strong> {name}</p>\
           <p><strong>Email:</strong> {email}</p>\
           <h3>Message:</h3>\
           <p style=\"white-space: pre-wrap;\">{message}</p>\
           <hr>\
           <p style=\"font-size: 12px;\">Submitted at: {at}</p>\
         </div>",
        name = escape_html(name),
        email = escape_html(email),
        message = escape_html(message),
        at = at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Submissions are attacker-controlled; escape them before interpolation
/// into the HTML body.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
