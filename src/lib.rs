//! studygroup - find, host and join campus study sessions
//!
//! This crate provides the core functionality for studygroup, including:
//! - Session records, campus locations, membership rules and form validation
//! - The identity service and document store, in-memory or over a socket
//! - The app context that backs every screen
//! - Client-server protocol and configuration
//!
//! # Architecture
//!
//! studygroup uses a client-server model where:
//! - The server (`studygroup-server`) hosts accounts and sessions in memory,
//!   mirrored to a JSON snapshot
//! - The client (`studygroup`) signs in and runs one screen per command
//! - Communication happens over Unix domain sockets

pub mod app;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod prefs;
pub mod protocol;
pub mod server;
pub mod session;
