pub mod assets;
pub mod assistant;
pub mod auth;
pub mod contact;
pub mod project;
