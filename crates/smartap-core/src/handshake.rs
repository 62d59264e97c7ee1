//! WebSocket upgrade handshake
//!
//! The device firmware validates the 101 response with a raw substring
//! search, not an HTTP parser, and it disconnects when headers it does not
//! expect are present. Every conformant WebSocket library injects
//! `Sec-WebSocket-Accept` (RFC 6455 mandates it) and usually `Server` and
//! `Date`, all of which the device rejects. The response here is a
//! fixed byte literal written straight to the socket.

use crate::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The exact response bytes the firmware accepts. No other header set,
/// order or casing works.
pub const UPGRADE_RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
\r\n";

const MAX_REQUEST_SIZE: usize = 8192;

/// Per-connection handshake states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingRequest,
    Upgraded,
    Rejected,
}

/// A parsed HTTP upgrade request
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    pub method: String,
    pub target: String,
    headers: Vec<(String, String)>,
}

impl UpgradeRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn parse(raw: &str) -> Result<Self> {
        let mut lines = raw.split("\r\n");
        let request_line = lines
            .next()
            .ok_or_else(|| Error::MalformedRequest("empty request".into()))?;

        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| Error::MalformedRequest("missing method".into()))?
            .to_string();
        let target = parts
            .next()
            .ok_or_else(|| Error::MalformedRequest("missing request target".into()))?
            .to_string();

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::MalformedRequest(format!("bad header line: {line:?}")))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self {
            method,
            target,
            headers,
        })
    }
}

/// Read one HTTP request from the raw stream, up to the blank line.
///
/// Single-byte reads so nothing past the request is consumed; protocol
/// frames follow immediately on the same stream.
pub async fn read_request<R: AsyncRead + Unpin>(r: &mut R) -> Result<UpgradeRequest> {
    let mut buf: Vec<u8> = Vec::with_capacity(512);
    let mut byte = [0u8; 1];

    while !buf.ends_with(b"\r\n\r\n") {
        if buf.len() >= MAX_REQUEST_SIZE {
            return Err(Error::MalformedRequest(format!(
                "request exceeds {MAX_REQUEST_SIZE} bytes"
            )));
        }
        r.read_exact(&mut byte).await?;
        buf.push(byte[0]);
    }

    let text = std::str::from_utf8(&buf)
        .map_err(|_| Error::MalformedRequest("request is not valid UTF-8".into()))?;
    UpgradeRequest::parse(text)
}

/// Validate an upgrade request against what the firmware sends.
///
/// The `Sec-WebSocket-Key` value is required but never used: the device
/// does not check an accept key, so none is computed.
pub fn validate_upgrade(req: &UpgradeRequest) -> Result<()> {
    if req.method != "GET" {
        return Err(Error::InvalidMethod(req.method.clone()));
    }

    let upgrade = req.header("Upgrade").unwrap_or("");
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::InvalidUpgradeHeader(upgrade.to_string()));
    }

    let connection = req.header("Connection").unwrap_or("");
    if !connection.to_ascii_lowercase().contains("upgrade") {
        return Err(Error::InvalidConnectionHeader(connection.to_string()));
    }

    let version = req.header("Sec-WebSocket-Version").unwrap_or("");
    if version != "13" {
        return Err(Error::InvalidWebSocketVersion(version.to_string()));
    }

    match req.header("Sec-WebSocket-Key") {
        Some(key) if !key.is_empty() => {}
        _ => return Err(Error::MissingWebSocketKey),
    }

    Ok(())
}

/// Per-connection handshake state machine.
///
/// `AwaitingRequest` → `Upgraded` on success, `Rejected` on any failure.
/// Failures are connection-fatal; no partial response is written.
#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::AwaitingRequest,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run the handshake on a raw stream: read the request, validate it,
    /// and write the exact response bytes.
    pub async fn run<S: AsyncRead + AsyncWrite + Unpin>(
        &mut self,
        stream: &mut S,
    ) -> Result<UpgradeRequest> {
        match self.run_inner(stream).await {
            Ok(req) => {
                self.state = HandshakeState::Upgraded;
                Ok(req)
            }
            Err(e) => {
                self.state = HandshakeState::Rejected;
                Err(e)
            }
        }
    }

    async fn run_inner<S: AsyncRead + AsyncWrite + Unpin>(
        &mut self,
        stream: &mut S,
    ) -> Result<UpgradeRequest> {
        let req = read_request(stream).await?;
        validate_upgrade(&req)?;
        stream.write_all(UPGRADE_RESPONSE).await?;
        stream.flush().await?;
        Ok(req)
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(extra: &str) -> UpgradeRequest {
        let raw = format!(
            "GET /ws HTTP/1.1\r\nHost: device.local\r\n{extra}\r\n",
        );
        UpgradeRequest::parse(&raw).unwrap()
    }

    #[test]
    fn test_valid_request_accepted() {
        let req = request(
            "Upgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: abc123\r\n",
        );
        assert!(validate_upgrade(&req).is_ok());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let req = request("UPGRADE: WebSocket\r\nconnection: keep-alive, Upgrade\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: k\r\n");
        assert!(validate_upgrade(&req).is_ok());
    }

    #[test]
    fn test_missing_key_rejected() {
        let req =
            request("Upgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Version: 13\r\n");
        assert!(matches!(
            validate_upgrade(&req),
            Err(Error::MissingWebSocketKey)
        ));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let req = request(
            "Upgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Version: 8\r\nSec-WebSocket-Key: k\r\n",
        );
        assert!(matches!(
            validate_upgrade(&req),
            Err(Error::InvalidWebSocketVersion(_))
        ));
    }

    #[test]
    fn test_response_bytes_exact() {
        // The one sequence the firmware's substring matching accepts.
        assert_eq!(
            UPGRADE_RESPONSE,
            b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n"
        );
    }
}
