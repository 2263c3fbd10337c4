//! Live server metadata over the Steam query protocol (A2S_INFO).

use crate::config::QueryConfig;
use crate::error::{ArkError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

const SINGLE_PACKET: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const SPLIT_PACKET: [u8; 4] = [0xFE, 0xFF, 0xFF, 0xFF];
const A2S_INFO_REQUEST: u8 = 0x54;
const A2S_INFO_RESPONSE: u8 = 0x49;
const S2C_CHALLENGE: u8 = 0x41;
const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// What a query returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub name: String,
    pub map: String,
    pub players: u32,
    pub max_players: u32,
}

/// Given host and port, return player and map metadata or fail.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, host: &str, port: u16) -> Result<QueryInfo>;
}

/// A2S_INFO over UDP.
#[derive(Debug, Clone)]
pub struct A2sClient {
    timeout: Duration,
}

impl Default for A2sClient {
    fn default() -> Self {
        Self {
            timeout: QueryConfig::TIMEOUT,
        }
    }
}

impl A2sClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exchange(&self, socket: &UdpSocket, request: &[u8]) -> Result<Vec<u8>> {
        socket.send(request).await?;
        let mut buf = vec![0u8; 1400];
        let n = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| query_error(format!("no reply within {:?}", self.timeout)))??;
        buf.truncate(n);
        Ok(buf)
    }
}

#[async_trait]
impl QueryClient for A2sClient {
    async fn query(&self, host: &str, port: u16) -> Result<QueryInfo> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect((host, port)).await?;

        let request = info_request(None);
        let mut reply = self.exchange(&socket, &request).await?;

        if let Some(challenge) = parse_challenge(&reply) {
            debug!("A2S challenge from {}:{}", host, port);
            reply = self.exchange(&socket, &info_request(Some(challenge))).await?;
        }

        parse_info(&reply)
    }
}

fn query_error(message: impl Into<String>) -> ArkError {
    ArkError::Other(format!("query failed: {}", message.into()))
}

/// Build an A2S_INFO request, with the challenge appended when given.
pub fn info_request(challenge: Option<[u8; 4]>) -> Vec<u8> {
    let mut out = Vec::with_capacity(29);
    out.extend_from_slice(&SINGLE_PACKET);
    out.push(A2S_INFO_REQUEST);
    out.extend_from_slice(INFO_PAYLOAD);
    if let Some(challenge) = challenge {
        out.extend_from_slice(&challenge);
    }
    out
}

fn parse_challenge(reply: &[u8]) -> Option<[u8; 4]> {
    if reply.len() >= 9 && reply[..4] == SINGLE_PACKET && reply[4] == S2C_CHALLENGE {
        let mut challenge = [0u8; 4];
        challenge.copy_from_slice(&reply[5..9]);
        Some(challenge)
    } else {
        None
    }
}

/// Parse an A2S_INFO response.
pub fn parse_info(reply: &[u8]) -> Result<QueryInfo> {
    if reply.len() >= 4 && reply[..4] == SPLIT_PACKET {
        return Err(query_error("split replies are not supported"));
    }
    if reply.len() < 6 || reply[..4] != SINGLE_PACKET || reply[4] != A2S_INFO_RESPONSE {
        return Err(query_error("unexpected reply header"));
    }

    let mut cursor = Cursor {
        data: reply,
        offset: 6, // header + protocol byte
    };
    let name = cursor.read_cstring()?;
    let map = cursor.read_cstring()?;
    let _folder = cursor.read_cstring()?;
    let _game = cursor.read_cstring()?;
    let _app_id = cursor.read_u16_le()?;
    let players = cursor.read_u8()?;
    let max_players = cursor.read_u8()?;

    Ok(QueryInfo {
        name,
        map,
        players: players as u32,
        max_players: max_players as u32,
    })
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.offset)
            .ok_or_else(|| query_error("truncated reply"))?;
        self.offset += 1;
        Ok(b)
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.offset.min(self.data.len())..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| query_error("unterminated string"))?;
        let s = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.offset += end + 1;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_reply(name: &str, map: &str, players: u8, max: u8) -> Vec<u8> {
        let mut out = SINGLE_PACKET.to_vec();
        out.push(A2S_INFO_RESPONSE);
        out.push(17);
        for s in [name, map, "ark_survival_evolved", "ARK: Survival Evolved"] {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out.extend_from_slice(&346110u32.to_le_bytes()[..2]);
        out.push(players);
        out.push(max);
        out.extend_from_slice(&[0, b'd', b'l', 0, 1]);
        out
    }

    #[test]
    fn test_info_request_layout() {
        let plain = info_request(None);
        assert_eq!(&plain[..5], &[0xFF, 0xFF, 0xFF, 0xFF, 0x54]);
        assert!(plain.ends_with(b"Source Engine Query\0"));

        let challenged = info_request(Some([1, 2, 3, 4]));
        assert!(challenged.ends_with(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_parse_info() {
        let info = parse_info(&info_reply("ARK - The Island", "TheIsland", 12, 70)).unwrap();
        assert_eq!(info.name, "ARK - The Island");
        assert_eq!(info.map, "TheIsland");
        assert_eq!(info.players, 12);
        assert_eq!(info.max_players, 70);
    }

    #[test]
    fn test_parse_info_rejects_garbage() {
        assert!(parse_info(&[0xFF, 0xFF]).is_err());
        assert!(parse_info(&[0xFE, 0xFF, 0xFF, 0xFF, 0x49, 0x11]).is_err());
        let mut truncated = info_reply("x", "y", 1, 2);
        truncated.truncate(12);
        assert!(parse_info(&truncated).is_err());
    }

    #[tokio::test]
    async fn test_query_with_challenge() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        tokio::spawn(async move {
            let mut buf = [0u8; 1400];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            let mut challenge = SINGLE_PACKET.to_vec();
            challenge.push(S2C_CHALLENGE);
            challenge.extend_from_slice(&[9, 8, 7, 6]);
            server.send_to(&challenge, peer).await.unwrap();

            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            assert!(buf[..n].ends_with(&[9, 8, 7, 6]));
            server
                .send_to(&info_reply("ARK - Ragnarok", "Ragnarok", 3, 40), peer)
                .await
                .unwrap();
        });

        let info = A2sClient::new().query("127.0.0.1", port).await.unwrap();
        assert_eq!(info.map, "Ragnarok");
        assert_eq!(info.players, 3);
    }

    #[tokio::test]
    async fn test_query_times_out() {
        // Bound but silent.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();

        let client = A2sClient::new().with_timeout(Duration::from_millis(100));
        assert!(client.query("127.0.0.1", port).await.is_err());
    }
}
