//! End-to-end client benchmarks against a loopback control unit.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use glonax_client::{Client, ConnectionConfig};
use glonax_protocol::frame::{Frame, Header};
use glonax_protocol::{
    Instance, MachineType, MessageType, FRAME_HEADER_SIZE, PROTOCOL_VERSION,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use uuid::Uuid;

async fn read_frame(stream: &mut TcpStream) -> Option<(MessageType, Vec<u8>)> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    stream.read_exact(&mut header).await.ok()?;
    let header = Header::decode(&header, PROTOCOL_VERSION).ok()?;
    let mut payload = vec![0u8; header.payload_len as usize];
    stream.read_exact(&mut payload).await.ok()?;
    Some((header.message_type, payload))
}

async fn write_frame(stream: &mut TcpStream, message_type: MessageType, payload: Vec<u8>) {
    let frame = Frame::new(message_type, payload).encode(PROTOCOL_VERSION).unwrap();
    stream.write_all(&frame).await.unwrap();
}

/// Answers the handshake, then echoes every probe.
async fn serve_unit(listener: TcpListener) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let instance = Instance {
        id: Uuid::nil(),
        machine_type: MachineType::WheelLoader,
        version: (1, 0, 0),
        model: "bench".to_string(),
        serial_number: "0".to_string(),
    };

    while let Some((message_type, payload)) = read_frame(&mut stream).await {
        match message_type {
            MessageType::Echo => write_frame(&mut stream, MessageType::Echo, payload).await,
            MessageType::Session => {
                let instance = instance.encode().unwrap().to_vec();
                write_frame(&mut stream, MessageType::Instance, instance).await;
            }
            _ => {}
        }
    }
}

fn setup_client(rt: &Runtime) -> Client {
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_unit(listener));

        let config = ConnectionConfig::new(addr.to_string()).with_user_agent("bench");
        Client::connect(config).await.unwrap()
    })
}

fn bench_ping_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup_client(&rt);

    let mut group = c.benchmark_group("e2e_ping");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ping", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(client.ping().await.unwrap()) });
    });

    group.finish();
}

fn bench_control_send(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup_client(&rt);

    let mut group = c.benchmark_group("e2e_control");
    group.throughput(Throughput::Elements(1));

    group.bench_function("engine_request", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(client.engine_request(1200).await.unwrap()) });
    });

    group.finish();
}

criterion_group!(benches, bench_ping_latency, bench_control_send);
criterion_main!(benches);
