//! haprobe - load balancer control-socket client.
//!
//! Opens a Unix domain socket or TCP connection to the control endpoint,
//! writes one command line, reads one reply and closes. Replies are handed
//! back undecoded; interpreting them is up to the caller.
//!
//! ```no_run
//! use haprobe::{query, ClientConfig, Command, Endpoint};
//!
//! # async fn run() -> Result<(), haprobe::ClientError> {
//! let endpoint = Endpoint::local("/run/haproxy/admin.sock")?;
//! let reply = query(&endpoint, &Command::new("show info"), &ClientConfig::default()).await?;
//! println!("{}", reply.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod items;
pub mod protocol;

pub use client::{query, query_with, Connector, SocketConnector};
pub use config::{ClientConfig, Config};
pub use endpoint::{parse_invocation, Endpoint, Invocation};
pub use error::ClientError;
pub use items::{ItemRequest, ITEMS};
pub use protocol::{Command, ReadMode, Response};
