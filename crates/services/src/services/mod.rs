pub mod auth;
pub mod board_connections;
pub mod cluster_bus;
pub mod events;
pub mod sync;
pub mod version_gate;
