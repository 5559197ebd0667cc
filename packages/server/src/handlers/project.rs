use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use catalog::{Cursor, NewImage};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::project::*;
use crate::state::AppState;
use crate::utils::filename::validate_image_filename;

const DEFAULT_PAGE_SIZE: usize = 9;
const DEFAULT_FEATURED_LIMIT: usize = 6;

/// Body limit layer for multipart project mutations (64 MB).
pub fn project_upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(64 * 1024 * 1024)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Projects",
    operation_id = "listProjects",
    summary = "List projects with cursor pagination",
    description = "Returns projects ordered by creation time descending. Pass the `cursor` \
        returned by the previous page to fetch the next one; a missing `nextCursor` in the \
        response means the listing is exhausted.",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "One page of projects", body = ProjectListResponse),
        (status = 400, description = "Invalid cursor (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 50);
    let cursor = query
        .cursor
        .filter(|c| !c.trim().is_empty())
        .map(Cursor::from_token);

    let page = state.catalog.list(page_size, cursor.as_ref()).await?;

    Ok(Json(ProjectListResponse {
        data: page.items.into_iter().map(ProjectResponse::from).collect(),
        next_cursor: page.next_cursor.map(|c| c.to_string()),
    }))
}

#[utoipa::path(
    get,
    path = "/featured",
    tag = "Projects",
    operation_id = "listFeaturedProjects",
    summary = "List featured projects for the homepage carousel",
    params(FeaturedListQuery),
    responses(
        (status = 200, description = "Featured projects, newest first", body = Vec<ProjectResponse>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_featured_projects(
    State(state): State<AppState>,
    Query(query): Query<FeaturedListQuery>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_FEATURED_LIMIT).clamp(1, 24);
    let projects = state.catalog.list_featured(limit).await?;
    Ok(Json(
        projects.into_iter().map(ProjectResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Projects",
    operation_id = "getProject",
    summary = "Get a project by ID",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id = %id))]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = state
        .catalog
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Projects",
    operation_id = "createProject",
    summary = "Create a project with its images",
    description = "Multipart request: a `payload` part carrying the CreateProjectRequest JSON \
        and one `image` file part per image. The record is written first so the uploads can be \
        keyed under its id; the image fields are patched in once every upload has finished. \
        At least one image is required. Requires an admin account.",
    request_body(content_type = "multipart/form-data", description = "payload JSON + image files"),
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn create_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;

    let (payload, images): (CreateProjectRequest, Vec<NewImage>) =
        read_project_upload(multipart, state.config.storage.max_blob_size).await?;
    validate_create_project(&payload)?;
    if images.is_empty() {
        return Err(AppError::Validation(
            "At least one image is required".into(),
        ));
    }

    let id = state
        .catalog
        .create(payload.into_draft(), images, None)
        .await?;
    let project = state
        .catalog
        .get(&id)
        .await?
        .ok_or_else(|| AppError::Internal("project missing after create".into()))?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Projects",
    operation_id = "updateProject",
    summary = "Update a project and reconcile its image set",
    description = "Multipart request mirroring create: a `payload` part with the \
        UpdateProjectRequest JSON and zero or more `image` file parts. `existingImages` lists \
        the already-remote URLs to keep, in display order; new uploads are appended after \
        them. The final image set must not be empty. Requires an admin account.",
    params(("id" = String, Path, description = "Project ID")),
    request_body(content_type = "multipart/form-data", description = "payload JSON + new image files"),
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id = %id))]
pub async fn update_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ProjectResponse>, AppError> {
    auth_user.require_admin()?;

    let (payload, new_images): (UpdateProjectRequest, Vec<NewImage>) =
        read_project_upload(multipart, state.config.storage.max_blob_size).await?;
    validate_update_project(&payload)?;

    let final_count = payload.existing_images.len() + new_images.len();
    if final_count == 0 {
        return Err(AppError::Validation(
            "A project must keep at least one image".into(),
        ));
    }
    if final_count > MAX_PROJECT_IMAGES {
        return Err(AppError::Validation(format!(
            "A project may have at most {MAX_PROJECT_IMAGES} images"
        )));
    }

    state
        .catalog
        .update(&id, payload.into_patch(), new_images, None)
        .await?;

    let project = state
        .catalog
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Projects",
    operation_id = "deleteProject",
    summary = "Delete a project and its stored images",
    description = "Deletes every image blob referenced by the project (best effort: blob \
        failures are logged and never abort the record delete), then the record itself. \
        Requires an admin account.",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn delete_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;

    state.catalog.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Read the `payload` JSON part and the `image` file parts of a project
/// mutation request.
async fn read_project_upload<T: DeserializeOwned>(
    mut multipart: Multipart,
    max_file_size: u64,
) -> Result<(T, Vec<NewImage>), AppError> {
    let mut payload: Option<T> = None;
    let mut images: Vec<NewImage> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("payload") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read payload: {e}")))?;
                payload = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| AppError::Validation(format!("Invalid payload JSON: {e}")))?,
                );
            }
            Some("image") => {
                if images.len() >= MAX_PROJECT_IMAGES {
                    return Err(AppError::Validation(format!(
                        "Too many image files (max {MAX_PROJECT_IMAGES})"
                    )));
                }
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        AppError::Validation("Image field must have a filename".into())
                    })?;
                let filename =
                    validate_image_filename(&filename).map_err(AppError::Validation)?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read image: {e}")))?;
                if bytes.len() as u64 > max_file_size {
                    return Err(AppError::Validation(format!(
                        "Image '{filename}' exceeds the maximum size of {max_file_size} bytes"
                    )));
                }
                images.push(NewImage {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let payload =
        payload.ok_or_else(|| AppError::Validation("Missing 'payload' field".into()))?;
    Ok((payload, images))
}
