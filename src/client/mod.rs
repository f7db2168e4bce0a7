//! Client module for haprobe.
//!
//! The client is a single-shot requester that:
//! - Opens a connection to a Unix domain socket or TCP control endpoint
//! - Writes one newline-terminated command
//! - Reads one reply buffer and closes the connection

pub mod socket;

pub use socket::{query, query_with, Connector, SocketConnector};
