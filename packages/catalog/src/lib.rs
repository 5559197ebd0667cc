pub mod cache;
pub mod cursor;
pub mod project;
pub mod service;
pub mod store;

pub use cache::{CatalogClient, QueryKey};
pub use cursor::Cursor;
pub use project::{NewImage, Project, ProjectDraft, ProjectPatch};
pub use service::{CatalogError, CatalogService};
pub use store::{ProjectPage, ProjectRecord, ProjectStore, RecordPatch, StoreError};
