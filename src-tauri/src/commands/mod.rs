pub mod auth;
pub mod config;
pub mod files;
pub mod inference;
pub mod navigation;
pub mod subscription;
pub mod upload;
pub mod viewer;
