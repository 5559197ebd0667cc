use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project")]
pub struct Model {
    /// UUIDv7 primary key, time-ordered like the creation timestamp.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,
    pub description: String,

    /// All image URLs in display order, stored as a JSON array.
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Json,
    /// Index into `images` of the cover image.
    pub primary_image_index: i32,
    /// Legacy single-image field; re-derived from `images` on every write.
    /// Pre-migration rows may carry only this with an empty `images` array.
    pub image_url: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub technologies: Json,

    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
