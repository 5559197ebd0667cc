pub mod assistant;
pub mod auth;
pub mod contact;
pub mod project;
pub mod shared;
