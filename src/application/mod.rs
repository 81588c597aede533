//! Application services layer.

pub mod auth;
pub mod error;
pub mod pages;
pub mod posts;
pub mod render;
pub mod repos;
