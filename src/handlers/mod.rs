//! Request handlers for the HTTP API and WebSocket endpoints

pub mod api;
pub mod websocket;

// Re-export the websocket handler
pub use websocket::handle_ws_client;
