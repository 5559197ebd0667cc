use std::sync::Arc;

use catalog::CatalogService;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::database::init_db;
use crate::genai::GenAiClient;
use crate::store::SeaOrmProjectStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub blobs: Arc<dyn BlobStore>,
    pub catalog: Arc<CatalogService>,
    pub genai: Arc<GenAiClient>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire up the database, blob store, catalog service and upstream
    /// client from configuration.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = init_db(&config.database.url).await?;

        let blobs: Arc<dyn BlobStore> = Arc::new(
            FilesystemBlobStore::new(
                config.storage.root.clone(),
                config.storage.public_base_url.clone(),
                config.storage.max_blob_size,
            )
            .await?,
        );

        let store = Arc::new(SeaOrmProjectStore::new(db.clone()));
        let catalog = Arc::new(CatalogService::new(store, blobs.clone()));
        let genai = Arc::new(GenAiClient::new(&config.ai));

        Ok(Self {
            db,
            blobs,
            catalog,
            genai,
            config: Arc::new(config),
        })
    }
}
