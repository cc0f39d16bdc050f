// Application layer - Layout, parameter resolution, substitution and session use cases
pub mod builder;
pub mod dashboard_repository;
pub mod dashboard_service;
pub mod events;
pub mod layout;
pub mod render;
pub mod resolution;
pub mod session;
pub mod streaming_service;
pub mod substitution;
pub mod templates;
