//! arplace-mock - stand-in optimizer for end-to-end runs
//!
//! Listens for a scene owner, decodes every message it sends, and answers
//! START_OPTIMIZATION by anchoring each element of the last SET_ELEMENTS at
//! cell (0, 0, 0) of container 0.
//!
//! Usage: arplace-mock [--port <PORT>]

use arplace_link::{encode_frame, Assignment, FrameDecoder, Message};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct SceneState {
    elements: usize,
    containers: usize,
    cells: usize,
    occlusions: usize,
    obstacles: usize,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = parse_port_arg(&args).unwrap_or(8080);
    let addr = format!("127.0.0.1:{}", port);

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            log::info!("Mock optimizer listening on {}", addr);
            l
        }
        Err(e) => {
            log::error!("Failed to bind mock optimizer on {}: {}", addr, e);
            return;
        }
    };

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                log::info!("Scene owner connected from {}", peer);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream).await {
                        log::error!("Connection error: {}", e);
                    }
                    log::info!("Scene owner disconnected: {}", peer);
                });
            }
            Err(e) => log::error!("Accept error: {}", e),
        }
    }
}

async fn handle_connection(mut stream: TcpStream) -> arplace_link::Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; 64 * 1024];
    let mut state = SceneState::default();

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        decoder.push(&chunk[..n]);

        while let Some(payload) = decoder.next_frame()? {
            match Message::decode(&payload)? {
                Message::Close => return Ok(()),
                Message::SetParams(params) => log::info!("Params: {:?}", params),
                Message::SetUser(user) => log::info!("User at {:?}", user.position),
                Message::SetElements(elements) => {
                    for e in &elements {
                        log::info!("Element {} dim {} size {:?}", e.id, e.dimension, e.size);
                    }
                    state.elements = elements.len();
                }
                Message::SetVoxels(containers) => {
                    state.containers = containers.len();
                    state.cells = containers.iter().map(|c| c.cells.len()).sum();
                }
                Message::SetObjects(objects) => log::info!("{} objects", objects.len()),
                Message::SetOcclusions(o) => state.occlusions = o.len(),
                Message::SetObstacles(o) => state.obstacles = o.len(),
                Message::StartOptimization => {
                    log::info!(
                        "Optimizing {} elements over {} containers ({} cells, {} occlusions, {} obstacles)",
                        state.elements,
                        state.containers,
                        state.cells,
                        state.occlusions,
                        state.obstacles
                    );
                    let assignments = (0..state.elements as i32)
                        .map(|element| Assignment { element, container: 0, index: [0, 0, 0] })
                        .collect();
                    let frame = encode_frame(&Message::Results(assignments).encode());
                    stream.write_all(&frame).await?;
                }
                Message::Results(_) => log::warn!("Unexpected RESULTS from scene owner"),
            }
        }
    }
}

fn parse_port_arg(args: &[String]) -> Option<u16> {
    args.iter()
        .position(|a| a == "--port")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
