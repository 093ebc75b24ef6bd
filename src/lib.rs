pub mod config;
pub mod findings;
pub mod mcp;
pub mod rating;
pub mod ratings_api;
pub mod subscription;
