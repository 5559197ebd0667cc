use catalog::{Project, ProjectDraft, ProjectPatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{double_option, validate_optional_url, validate_title};

/// Most images a single project may carry.
pub const MAX_PROJECT_IMAGES: usize = 12;

/// JSON part of the multipart create request (`payload` field); image files
/// ride alongside it as `image` parts.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    /// Index into the uploaded image files designating the cover image.
    #[serde(default)]
    pub primary_image_index: usize,
}

/// JSON part of the multipart update request. Fields omitted stay
/// unchanged. `existingImages` lists the already-remote URLs the editor
/// kept, in display order; new files are appended after them.
#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub github_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub live_url: Option<Option<String>>,
    pub featured: Option<bool>,
    pub primary_image_index: Option<usize>,
    #[serde(default)]
    pub existing_images: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub primary_image_index: usize,
    pub image_url: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            images: p.images,
            primary_image_index: p.primary_image_index,
            image_url: p.image_url,
            technologies: p.technologies,
            github_url: p.github_url,
            live_url: p.live_url,
            featured: p.featured,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListResponse {
    pub data: Vec<ProjectResponse>,
    /// Opaque token for the next page; absent once the listing is exhausted.
    pub next_cursor: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    /// Items per page (1-50, default 9).
    pub page_size: Option<usize>,
    /// Opaque cursor returned by the previous page.
    pub cursor: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct FeaturedListQuery {
    /// Maximum number of featured projects (1-24, default 6).
    pub limit: Option<usize>,
}

impl CreateProjectRequest {
    pub fn into_draft(self) -> ProjectDraft {
        ProjectDraft {
            title: self.title.trim().to_string(),
            description: self.description,
            technologies: self.technologies,
            github_url: none_if_blank(self.github_url),
            live_url: none_if_blank(self.live_url),
            featured: self.featured,
            primary_image_index: self.primary_image_index,
        }
    }
}

impl UpdateProjectRequest {
    pub fn into_patch(self) -> ProjectPatch {
        ProjectPatch {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            technologies: self.technologies,
            github_url: self.github_url.map(none_if_blank),
            live_url: self.live_url.map(none_if_blank),
            featured: self.featured,
            primary_image_index: self.primary_image_index,
            existing_images: self.existing_images,
        }
    }
}

fn none_if_blank(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

pub fn validate_create_project(req: &CreateProjectRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    validate_technologies(&req.technologies)?;
    validate_optional_url(req.github_url.as_deref(), "githubUrl")?;
    validate_optional_url(req.live_url.as_deref(), "liveUrl")?;
    Ok(())
}

pub fn validate_update_project(req: &UpdateProjectRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(ref technologies) = req.technologies {
        validate_technologies(technologies)?;
    }
    if let Some(ref github_url) = req.github_url {
        validate_optional_url(github_url.as_deref(), "githubUrl")?;
    }
    if let Some(ref live_url) = req.live_url {
        validate_optional_url(live_url.as_deref(), "liveUrl")?;
    }
    if req.existing_images.len() > MAX_PROJECT_IMAGES {
        return Err(AppError::Validation(format!(
            "A project may keep at most {MAX_PROJECT_IMAGES} images"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() || description.len() > 20_000 {
        return Err(AppError::Validation(
            "Description must be non-empty and at most 20000 bytes".into(),
        ));
    }
    Ok(())
}

/// Technology labels: short, unique, at most 20 of them. Duplicates are
/// rejected at this input edge so the stored set stays unique.
fn validate_technologies(technologies: &[String]) -> Result<(), AppError> {
    if technologies.len() > 20 {
        return Err(AppError::Validation("At most 20 technologies".into()));
    }
    let mut seen = std::collections::HashSet::new();
    for tech in technologies {
        let tech = tech.trim();
        if tech.is_empty() || tech.chars().count() > 64 {
            return Err(AppError::Validation(
                "Each technology must be 1-64 characters".into(),
            ));
        }
        if !seen.insert(tech.to_lowercase()) {
            return Err(AppError::Validation(format!(
                "Duplicate technology '{tech}'"
            )));
        }
    }
    Ok(())
}
