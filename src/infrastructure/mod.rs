// Infrastructure layer - External dependencies and adapters
pub mod board_store;
pub mod catalog_repository;
pub mod chunked_stream;
pub mod config;
pub mod embed_codec;
pub mod http_response;
pub mod signed_token;
