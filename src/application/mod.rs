// Application layer - Use cases orchestrating the core state and its ports
pub mod calibration_service;
pub mod dashboard_service;
pub mod error;
pub mod history_service;
pub mod ingest_service;
pub mod ports;
pub mod settings_service;
pub mod tank_repository;
pub mod view_mode;

#[cfg(test)]
pub mod fakes;
