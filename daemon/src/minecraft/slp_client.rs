use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use encoding::{all::UTF_8, DecoderTrap, Encoding};
use forgeserv_protocol::minecraft::{PingPayload, PingResult};
use log::debug;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

use super::varint::{read_varint, write_varint, ProtocolError};

/// Protocol version announced in the handshake; status requests accept any.
pub const PROTOCOL_VERSION: u32 = 4;
/// No status response is shorter than this, so anything smaller is not a game server.
pub const MIN_RESPONSE_LENGTH: u32 = 10;
pub const MAX_JSON_LENGTH: u32 = 1 << 20;
const NEXT_STATE_STATUS: u32 = 1;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to connect: {0}")]
    Connect(#[source] std::io::Error),
    #[error("timed out during {0}")]
    Timeout(&'static str),
    #[error("stream not initialized")]
    NotConnected,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("response length {0} is too short for a status packet")]
    Undersized(u32),
    #[error("declared json length {0} exceeds the limit")]
    Oversized(u32),
    #[error("undecodable status text: {0}")]
    Encoding(String),
    #[error("malformed status payload: {0}")]
    Payload(#[from] serde_json::Error),
}

async fn with_timeout<F, T>(limit: Duration, step: &'static str, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    time::timeout(limit, fut)
        .await
        .map_err(|_| ProbeError::Timeout(step))?
}

// 状态机 trait
pub trait SlpClientState {}

// 未连接状态
pub struct Unconnected;
impl SlpClientState for Unconnected {}

// 已连接状态
pub struct Connected;
impl SlpClientState for Connected {}

pub struct SlpClient<TState: SlpClientState> {
    stream: Option<TcpStream>,
    buffer: Vec<u8>,
    timeout: Duration,
    _state: PhantomData<TState>,
}

impl SlpClient<Unconnected> {
    pub fn new(timeout: Duration) -> Self {
        SlpClient {
            stream: None,
            buffer: Vec::new(),
            timeout,
            _state: PhantomData,
        }
    }

    pub async fn handshake(self, host: &str, port: u16) -> Result<SlpClient<Connected>, ProbeError> {
        let stream = with_timeout(self.timeout, "connect", async {
            TcpStream::connect((host, port))
                .await
                .map_err(ProbeError::Connect)
        })
        .await?;
        let mut client = SlpClient {
            stream: Some(stream),
            buffer: self.buffer,
            timeout: self.timeout,
            _state: PhantomData::<Connected>,
        };

        write_varint(&mut client.buffer, PROTOCOL_VERSION);
        client.write_string(host);
        client.write_short(port);
        write_varint(&mut client.buffer, NEXT_STATE_STATUS);
        client.flush(0).await?;

        Ok(client)
    }
}

impl<TState: SlpClientState> SlpClient<TState> {
    fn write_short(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    fn write_string(&mut self, value: &str) {
        let data = value.as_bytes();
        write_varint(&mut self.buffer, data.len() as u32);
        self.buffer.extend_from_slice(data);
    }

    /// Sends the buffered fields as one packet: length, id, payload.
    async fn flush(&mut self, id: u32) -> Result<(), ProbeError> {
        let data = std::mem::take(&mut self.buffer);
        let mut packet_id = Vec::new();
        write_varint(&mut packet_id, id);

        let mut packet = Vec::with_capacity(data.len() + packet_id.len() + 5);
        write_varint(&mut packet, (data.len() + packet_id.len()) as u32);
        packet.extend_from_slice(&packet_id);
        packet.extend_from_slice(&data);

        let limit = self.timeout;
        let stream = self.stream.as_mut().ok_or(ProbeError::NotConnected)?;
        with_timeout(limit, "write", async {
            stream.write_all(&packet).await?;
            stream.flush().await?;
            Ok::<(), ProbeError>(())
        })
        .await
    }
}

impl SlpClient<Connected> {
    pub async fn get_status(&mut self) -> Result<PingPayload, ProbeError> {
        self.flush(0).await?;
        let limit = self.timeout;
        let stream = self.stream.as_mut().ok_or(ProbeError::NotConnected)?;
        with_timeout(limit, "status read", read_status(stream)).await
    }
}

/// Reads one status response frame and parses its JSON body.
pub async fn read_status<R>(reader: &mut R) -> Result<PingPayload, ProbeError>
where
    R: AsyncRead + Unpin,
{
    let length = read_varint(reader).await?;
    if length < MIN_RESPONSE_LENGTH {
        return Err(ProbeError::Undersized(length));
    }
    let packet_id = reader.read_u8().await?;
    let json_length = read_varint(reader).await?;
    debug!(
        "Received packetId 0x{:02x} with a length of {}",
        packet_id, length
    );
    if json_length > MAX_JSON_LENGTH {
        return Err(ProbeError::Oversized(json_length));
    }

    let mut data = vec![0u8; json_length as usize];
    reader.read_exact(&mut data).await?;
    let json = UTF_8
        .decode(&data, DecoderTrap::Replace)
        .map_err(|e| ProbeError::Encoding(e.into_owned()))?;
    Ok(serde_json::from_str::<PingPayload>(&json)?)
}

pub fn into_ping_result(payload: PingPayload) -> PingResult {
    let icon = payload
        .favicon_data()
        .and_then(|data| match B64.decode(data) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("ignoring undecodable favicon: {}", e);
                None
            }
        });
    PingResult {
        description: payload.description,
        icon,
        players: payload.players.sample,
        version_name: payload.version.name,
        protocol: payload.version.protocol,
    }
}

/// Full handshake + status exchange against one endpoint.
pub async fn ping(host: &str, port: u16, timeout: Duration) -> Result<PingResult, ProbeError> {
    let mut client = SlpClient::new(timeout).handshake(host, port).await?;
    let payload = client.get_status().await?;
    Ok(into_ping_result(payload))
}

/// Probes `host:port` and yields a status only for a well-formed exchange.
///
/// Every failure is an expected outcome when probing arbitrary ports, so it
/// is logged and collapsed to `None`. The socket is dropped on every path.
pub async fn query(host: &str, port: u16, timeout: Duration) -> Option<PingResult> {
    match ping(host, port, timeout).await {
        Ok(result) => Some(result),
        Err(e) => {
            debug!("no status from {}:{}: {}", host, port, e);
            None
        }
    }
}

#[async_trait::async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, host: &str, port: u16) -> Option<PingResult>;
}

pub struct SlpPinger {
    timeout: Duration,
}

impl SlpPinger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl Pinger for SlpPinger {
    async fn ping(&self, host: &str, port: u16) -> Option<PingResult> {
        query(host, port, self.timeout).await
    }
}
