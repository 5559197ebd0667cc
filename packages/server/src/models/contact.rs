use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::validate_email;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContactResponse {
    /// Id of the stored submission.
    pub id: String,
}

pub fn validate_contact(req: &ContactRequest) -> Result<(), AppError> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > 128 {
        return Err(AppError::Validation("Name must be 1-128 characters".into()));
    }
    validate_email(&req.email)?;
    let message = req.message.trim();
    if message.is_empty() || message.chars().count() > 5000 {
        return Err(AppError::Validation(
            "Message must be 1-5000 characters".into(),
        ));
    }
    Ok(())
}
