//! Scripted control unit for tests.

use crate::connection::ConnectionConfig;
use glonax_protocol::{
    decode_header, encode_header, Instance, MachineType, MessageType, FRAME_HEADER_SIZE,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

pub(crate) struct FakeUnit {
    listener: TcpListener,
}

impl FakeUnit {
    pub(crate) async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self { listener }
    }

    pub(crate) fn config(&self) -> ConnectionConfig {
        let addr = self.listener.local_addr().unwrap();
        ConnectionConfig::new(addr.to_string())
    }

    pub(crate) async fn accept(&self) -> TcpStream {
        let (stream, _) = self.listener.accept().await.unwrap();
        stream
    }
}

pub(crate) async fn read_frame(stream: &mut TcpStream) -> (MessageType, Vec<u8>) {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    stream.read_exact(&mut header).await.unwrap();
    let (ty, len) = decode_header(&header).unwrap();
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await.unwrap();
    (ty, payload)
}

pub(crate) async fn write_frame(stream: &mut TcpStream, ty: MessageType, payload: &[u8]) {
    let mut buf = encode_header(ty, payload.len() as u16).to_vec();
    buf.extend_from_slice(payload);
    stream.write_all(&buf).await.unwrap();
}

pub(crate) async fn write_raw(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).await.unwrap();
}

pub(crate) fn sample_instance() -> Instance {
    Instance {
        id: Uuid::parse_str("0b6a1f3e-7c2d-4e5f-9a8b-1c2d3e4f5a6b").unwrap(),
        machine_type: MachineType::Excavator,
        version: (1, 2, 3),
        model: "EX200".to_string(),
        serial_number: "SN123".to_string(),
    }
}

/// Plays the control unit side of a successful handshake.
pub(crate) async fn serve_handshake(stream: &mut TcpStream) -> String {
    let (ty, echo) = read_frame(stream).await;
    assert_eq!(ty, MessageType::Echo);
    write_frame(stream, MessageType::Echo, &echo).await;

    let (ty, session) = read_frame(stream).await;
    assert_eq!(ty, MessageType::Session);

    let instance = sample_instance().encode().unwrap();
    write_frame(stream, MessageType::Instance, &instance).await;

    String::from_utf8(session[1..].to_vec()).unwrap()
}
