// Public API for integration tests and potential library usage

pub mod api;
pub mod broadcast;
pub mod engine;
pub mod protocol;
pub mod supplier;
pub mod transport;
pub mod types;
pub mod ws;
