//! Monitoring item keys.
//!
//! Each item key is bound to one control command and addressed with either
//! `key[socket_path]` or `key[host, port]`, the way monitoring agents spell
//! parameterized keys.

use crate::endpoint::{parse_port, Endpoint, Invocation};
use crate::error::ClientError;
use crate::protocol::Command;
use serde::Serialize;

/// A supported item key and the command it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Item {
    pub key: &'static str,
    pub command: &'static str,
    pub description: &'static str,
}

/// Every supported item key.
pub const ITEMS: &[Item] = &[
    Item {
        key: "haproxy.frontend.autodiscovery",
        command: "show stat",
        description: "Raw stat CSV for frontend discovery",
    },
    Item {
        key: "haproxy.backend.autodiscovery",
        command: "show stat",
        description: "Raw stat CSV for backend discovery",
    },
    Item {
        key: "haproxy.stat.csv",
        command: "show stat",
        description: "Counters for each proxy and server, CSV",
    },
    Item {
        key: "haproxy.stat.json",
        command: "show stat json",
        description: "Counters for each proxy and server, JSON",
    },
    Item {
        key: "haproxy.info.text",
        command: "show info",
        description: "Information about the running process",
    },
    Item {
        key: "haproxy.info.json",
        command: "show info json",
        description: "Information about the running process, JSON",
    },
    Item {
        key: "haproxy.pools.text",
        command: "show pools",
        description: "Memory pool usage",
    },
    Item {
        key: "haproxy.activity.text",
        command: "show activity",
        description: "Per-thread activity counters",
    },
];

/// Find an item by key.
pub fn lookup(key: &str) -> Option<&'static Item> {
    ITEMS.iter().find(|item| item.key == key)
}

/// A parsed `key[param, ...]` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    pub key: String,
    pub params: Vec<String>,
}

impl ItemRequest {
    /// Parse an item key with optional bracketed parameters.
    ///
    /// Parameters are comma separated and trimmed. A parameter may be
    /// double-quoted to carry commas; `\"` inside quotes is a literal quote.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let raw = raw.trim();
        let invalid = |reason| ClientError::InvalidItemKey {
            key: raw.to_string(),
            reason,
        };

        let (key, params) = match raw.find('[') {
            Some(open) => {
                let inner = raw[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| invalid("missing closing bracket"))?;
                (&raw[..open], split_params(inner).map_err(invalid)?)
            }
            None if raw.contains(']') => return Err(invalid("unexpected closing bracket")),
            None => (raw, Vec::new()),
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(invalid("empty key"));
        }

        Ok(Self {
            key: key.to_string(),
            params,
        })
    }

    /// The catalog entry for this key.
    pub fn item(&self) -> Result<&'static Item, ClientError> {
        lookup(&self.key).ok_or_else(|| ClientError::UnknownItem(self.key.clone()))
    }

    /// One parameter is a socket path, two are host and port.
    pub fn endpoint(&self) -> Result<Endpoint, ClientError> {
        match self.params.as_slice() {
            [path] => Endpoint::local(path.as_str()),
            [host, port] => Ok(Endpoint::network(host.as_str(), parse_port(port)?)),
            params => Err(ClientError::InvalidParameterCount {
                got: params.len(),
                expected: "1 (socket path) or 2 (host, port)",
            }),
        }
    }

    /// Resolve the request into an endpoint and command.
    pub fn invocation(&self) -> Result<Invocation, ClientError> {
        let item = self.item()?;
        Ok(Invocation {
            endpoint: self.endpoint()?,
            command: Command::new(item.command),
        })
    }
}

fn split_params(inner: &str) -> Result<Vec<String>, &'static str> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut param = String::new();
        if chars.next_if_eq(&'"').is_some() {
            loop {
                match chars.next() {
                    Some('\\') if chars.peek() == Some(&'"') => {
                        chars.next();
                        param.push('"');
                    }
                    Some('"') => break,
                    Some(c) => param.push(c),
                    None => return Err("unterminated quote"),
                }
            }
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if !matches!(chars.peek(), None | Some(',')) {
                return Err("text after closing quote");
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                param.push(c);
            }
            param.truncate(param.trim_end().len());
        }
        params.push(param);

        match chars.next() {
            Some(',') => continue,
            _ => break,
        }
    }
    Ok(params)
}
