use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request};

// Anything that knows where it came from
pub trait RemoteAddr {
    fn remote_addr(&self) -> Cow<'_, str>;
}

impl RemoteAddr for str {
    fn remote_addr(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl RemoteAddr for &str {
    fn remote_addr(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl RemoteAddr for String {
    fn remote_addr(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl RemoteAddr for SocketAddr {
    fn remote_addr(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

// Needs the router served with connect info, otherwise every request looks
// like it came from ""
impl RemoteAddr for Request {
    fn remote_addr(&self) -> Cow<'_, str> {
        match self.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => Cow::Owned(addr.to_string()),
            None => Cow::Borrowed(""),
        }
    }
}

/// Derive the client key from a `host` or `host:port` origin address.
///
/// Never fails: input that can't be split is handed back as is.
pub fn client_key(remote_addr: &str) -> String {
    // "[2001:db8::1]:443" and "203.0.113.5:80"
    if let Ok(addr) = remote_addr.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    // bare address, v6 included, with or without brackets
    let bare = remote_addr
        .strip_prefix('[')
        .and_then(|addr| addr.strip_suffix(']'))
        .unwrap_or(remote_addr);
    if bare.parse::<IpAddr>().is_ok() {
        return bare.to_string();
    }
    if !remote_addr.contains(':') {
        return remote_addr.to_string();
    }

    let fields: Vec<&str> = remote_addr.split(':').collect();
    if fields.len() < 2 {
        return remote_addr.to_string();
    }
    fields[0].to_string()
}
