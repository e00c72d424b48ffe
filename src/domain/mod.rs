// Domain layer - Tanks, registry, windowed series and historical views
pub mod dashboard;
pub mod history;
pub mod registry;
pub mod tank;
pub mod telemetry;
pub mod window;
