pub mod admin;
pub mod asset;
pub mod auth;
pub mod file;
