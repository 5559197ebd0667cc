use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contact-form submissions; write-only from the client's perspective.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contact")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,
    pub email: String,
    pub message: String,

    pub submitted_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
