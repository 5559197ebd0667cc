pub mod contact;
pub mod mail;
pub mod project;
pub mod user;
