//! # TCP Listener
//!
//! Binds the listening socket and spawns one worker task per accepted
//! connection. Each worker speaks the line-oriented wire protocol directly
//! over a fixed-size read buffer — commands are expected to fit in a single
//! 1024-byte recv, per the protocol's framing contract.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::watch;

use crate::dispatcher::{DispatchOutcome, Dispatcher};

const READ_BUFFER_BYTES: usize = 1024;

pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub async fn bind(addr: impl ToSocketAddrs, dispatcher: Arc<Dispatcher>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, dispatcher })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` changes, spawning one worker
    /// task per connection. Each worker is handed a clone of `shutdown` so
    /// it can stop waiting on its socket read and drain on its own.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> std::io::Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (socket, peer) = accepted?;
                    let dispatcher = self.dispatcher.clone();
                    let mut worker_shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        tracing::info!(%peer, "connection accepted");
                        if let Err(error) = handle_connection(socket, dispatcher, &mut worker_shutdown).await {
                            tracing::warn!(%peer, %error, "connection ended with an I/O error");
                        }
                        tracing::info!(%peer, "connection closed");
                    });
                }
                _ = shutdown.changed() => {
                    tracing::info!("no longer accepting new connections");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    dispatcher: Arc<Dispatcher>,
    shutdown: &mut watch::Receiver<bool>,
) -> std::io::Result<()> {
    let mut buf = [0u8; READ_BUFFER_BYTES];
    loop {
        let read = tokio::select! {
            read = socket.read(&mut buf) => read?,
            _ = shutdown.changed() => break,
        };
        if read == 0 {
            break; // client closed its side
        }
        let line = String::from_utf8_lossy(&buf[..read]);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        match dispatcher.handle_line(line).await {
            DispatchOutcome::Reply(reply) => {
                socket.write_all(reply.as_bytes()).await?;
                socket.write_all(b"\n").await?;
            }
            DispatchOutcome::Close(farewell) => {
                socket.write_all(farewell.as_bytes()).await?;
                socket.write_all(b"\n").await?;
                break;
            }
        }
    }
    Ok(())
}
