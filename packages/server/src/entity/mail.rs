use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification-trigger rows consumed by the external mail dispatcher.
/// Insert-only fire-and-forget sink; nothing in this service reads it back.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mail")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
