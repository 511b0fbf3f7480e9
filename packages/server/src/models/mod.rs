pub mod asset;
pub mod auth;
pub mod shared;
pub mod stats;
