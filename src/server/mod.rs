//! Server module - Unix socket listener and client connection handling

pub mod connection;
mod listener;

pub use connection::ClientConnection;
pub use listener::ServerListener;
