//! HTTP API handlers for flexlingo-server

pub mod health;
pub mod ports;
pub mod start;
pub mod status;

pub use health::health_routes;
pub use ports::list_ports;
pub use start::start_prediction;
pub use status::get_status;
