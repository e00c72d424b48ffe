// Infrastructure layer - External dependencies and adapters
pub mod backend_repository;
pub mod chunked_json;
pub mod config;
pub mod event_bus;
pub mod http_response;
pub mod json_mapper;
