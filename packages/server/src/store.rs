use async_trait::async_trait;
use catalog::cursor::{self, CursorPos};
use catalog::{
    Cursor, Project, ProjectPage, ProjectRecord, ProjectStore, RecordPatch, StoreError,
};
use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::project;

/// Largest page a single list call will return.
const MAX_PAGE_SIZE: usize = 100;

/// [`ProjectStore`] over the relational document table, with keyset
/// pagination on `(created_at DESC, id DESC)`. Cursor tokens identify the
/// last-seen row, so pages stay stable under concurrent inserts.
pub struct SeaOrmProjectStore {
    db: DatabaseConnection,
}

impl SeaOrmProjectStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectStore for SeaOrmProjectStore {
    async fn list(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<ProjectPage, StoreError> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let mut select = project::Entity::find()
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id);

        if let Some(cursor) = cursor {
            let pos = cursor::decode(cursor)
                .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
            let created_at = pos
                .created_at()
                .ok_or_else(|| StoreError::InvalidCursor("timestamp out of range".into()))?;
            let id = Uuid::parse_str(&pos.id)
                .map_err(|_| StoreError::InvalidCursor("malformed id".into()))?;

            select = select.filter(
                Condition::any()
                    .add(project::Column::CreatedAt.lt(created_at))
                    .add(
                        Condition::all()
                            .add(project::Column::CreatedAt.eq(created_at))
                            .add(project::Column::Id.lt(id)),
                    ),
            );
        }

        // One extra row decides whether another page exists.
        let mut models = select
            .limit(Some(page_size as u64 + 1))
            .all(&self.db)
            .await
            .map_err(backend)?;
        let has_more = models.len() > page_size;
        models.truncate(page_size);

        let next_cursor = if has_more {
            models
                .last()
                .map(|m| cursor::encode(&CursorPos::new(m.created_at, m.id.to_string())))
        } else {
            None
        };

        Ok(ProjectPage {
            items: models.into_iter().map(to_domain).collect(),
            next_cursor,
        })
    }

    async fn list_featured(&self, limit: usize) -> Result<Vec<Project>, StoreError> {
        let models = project::Entity::find()
            .filter(project::Column::Featured.eq(true))
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id)
            .limit(Some(limit.clamp(1, MAX_PAGE_SIZE) as u64))
            .all(&self.db)
            .await
            .map_err(backend)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Project>, StoreError> {
        // A malformed id cannot name any document.
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let model = project::Entity::find_by_id(uuid)
            .one(&self.db)
            .await
            .map_err(backend)?;
        Ok(model.map(to_domain))
    }

    async fn create(&self, record: ProjectRecord) -> Result<String, StoreError> {
        let now = Utc::now();
        let model = project::ActiveModel {
            id: Set(Uuid::now_v7()),
            title: Set(record.title),
            description: Set(record.description),
            // Empty placeholders: blob keys need the id first.
            images: Set(serde_json::json!([])),
            primary_image_index: Set(0),
            image_url: Set(String::new()),
            technologies: Set(serde_json::json!(record.technologies)),
            github_url: Set(record.github_url),
            live_url: Set(record.live_url),
            featured: Set(record.featured),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = model.insert(&self.db).await.map_err(backend)?;
        Ok(model.id.to_string())
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), StoreError> {
        let uuid =
            Uuid::parse_str(id).map_err(|_| StoreError::NotFound(id.to_string()))?;
        let existing = project::Entity::find_by_id(uuid)
            .one(&self.db)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut active: project::ActiveModel = existing.into();

        if let Some(title) = patch.title {
            active.title = Set(title);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(technologies) = patch.technologies {
            active.technologies = Set(serde_json::json!(technologies));
        }
        if let Some(github_url) = patch.github_url {
            active.github_url = Set(github_url);
        }
        if let Some(live_url) = patch.live_url {
            active.live_url = Set(live_url);
        }
        if let Some(featured) = patch.featured {
            active.featured = Set(featured);
        }
        if let Some(images) = patch.images {
            active.images = Set(serde_json::json!(images));
        }
        if let Some(image_url) = patch.image_url {
            active.image_url = Set(image_url);
        }
        if let Some(primary) = patch.primary_image_index {
            let primary = i32::try_from(primary)
                .map_err(|_| backend_msg("primary image index overflow"))?;
            active.primary_image_index = Set(primary);
        }
        active.updated_at = Set(Utc::now());

        active.update(&self.db).await.map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let uuid =
            Uuid::parse_str(id).map_err(|_| StoreError::NotFound(id.to_string()))?;
        let result = project::Entity::delete_by_id(uuid)
            .exec(&self.db)
            .await
            .map_err(backend)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn to_domain(model: project::Model) -> Project {
    Project {
        id: model.id.to_string(),
        title: model.title,
        description: model.description,
        images: json_strings(model.images),
        primary_image_index: Ord::max(model.primary_image_index, 0) as usize,
        image_url: model.image_url,
        technologies: json_strings(model.technologies),
        github_url: model.github_url,
        live_url: model.live_url,
        featured: model.featured,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn json_strings(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(anyhow::Error::new(err))
}

fn backend_msg(msg: &str) -> StoreError {
    StoreError::Backend(anyhow::anyhow!(msg.to_string()))
}
