// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP distribution peer
//!
//! Every peer both listens for frames from the roster and pushes its own
//! decider snapshots to every other device. Connections are short-lived:
//! one frame per connection, sender connects, writes, disconnects. Network
//! failures are logged and the affected frame is skipped; the engine never
//! stops because a peer is down.

use crate::distributed::crypto::{FrameCrypto, FRAME_SENTINEL, MIN_FRAME_LENGTH};
use crate::distributed::device::DeviceRoster;
use crate::distributed::message::PeerMessage;
use crate::engine::subscriber::{DeciderSubscriber, DistributedSubscriber};
use crate::engine::EngineTask;
use crate::error::{CepFlowError, CepFlowResult};
use crate::run::{DeciderSnapshot, RunTuple};
use crate::util::queue::stage_queue;
use crossbeam_channel::{Receiver as QueueReceiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Distribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedConfig {
    /// URN of the local device; must appear in the roster
    pub urn: String,
    /// Shared cluster key, 16, 24 or 32 bytes
    pub key: String,
    /// Padding character for plaintext alignment
    pub pad_char: char,
    /// Bounded queue capacity for both directions; 0 = unbounded
    pub max_size: usize,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Read chunk size for the stream reader
    pub recv_bytes: usize,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            urn: String::new(),
            key: String::new(),
            pad_char: '*',
            max_size: 255,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            recv_bytes: 2048,
        }
    }
}

/// TCP snapshot exchange with every other device in the roster
pub struct DistributedTcp {
    outgoing_tx: Sender<DeciderSnapshot>,
    incoming_rx: QueueReceiver<DeciderSnapshot>,
    capacity: usize,
    subscribers: Vec<Arc<dyn DistributedSubscriber>>,
    closed: Arc<AtomicBool>,
    sender_thread: Option<JoinHandle<()>>,
    acceptor_thread: Option<JoinHandle<()>>,
}

impl DistributedTcp {
    /// Bind the local listener and start the sender and acceptor threads
    pub fn new(config: &DistributedConfig, roster: DeviceRoster) -> CepFlowResult<Self> {
        let local = roster
            .by_urn(&config.urn)
            .ok_or_else(|| {
                CepFlowError::invalid_parameter_with_name("not in the device roster", "urn")
            })?
            .clone();
        let crypto = Arc::new(FrameCrypto::new(config.key.as_bytes(), config.pad_char)?);

        let (outgoing_tx, outgoing_rx) = stage_queue::<DeciderSnapshot>(config.max_size);
        let (incoming_tx, incoming_rx) = stage_queue::<DeciderSnapshot>(config.max_size);
        let closed = Arc::new(AtomicBool::new(false));

        let listener = TcpListener::bind(local.socket_addr())?;
        listener.set_nonblocking(true)?;

        let sender_thread = {
            let roster = roster.clone();
            let crypto = Arc::clone(&crypto);
            let closed = Arc::clone(&closed);
            let local = local.clone();
            let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
            let write_timeout = Duration::from_millis(config.write_timeout_ms);
            std::thread::Builder::new()
                .name("dist-sender".to_string())
                .spawn(move || {
                    sender_loop(
                        outgoing_rx,
                        roster,
                        local.urn,
                        local.id_key,
                        crypto,
                        closed,
                        connect_timeout,
                        write_timeout,
                    )
                })
                .map_err(CepFlowError::IoError)?
        };

        let acceptor_thread = {
            let roster = roster.clone();
            let crypto = Arc::clone(&crypto);
            let closed = Arc::clone(&closed);
            let local_urn = local.urn.clone();
            let read_timeout = Duration::from_millis(config.read_timeout_ms);
            let recv_bytes = config.recv_bytes.max(1);
            std::thread::Builder::new()
                .name("dist-acceptor".to_string())
                .spawn(move || {
                    acceptor_loop(
                        listener,
                        roster,
                        local_urn,
                        crypto,
                        incoming_tx,
                        closed,
                        read_timeout,
                        recv_bytes,
                    )
                })
                .map_err(CepFlowError::IoError)?
        };

        Ok(Self {
            outgoing_tx,
            incoming_rx,
            capacity: config.max_size,
            subscribers: Vec::new(),
            closed,
            sender_thread: Some(sender_thread),
            acceptor_thread: Some(acceptor_thread),
        })
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn DistributedSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Egress handle: subscribes to the local decider
    pub fn handle(&self) -> DistributedHandle {
        DistributedHandle {
            outgoing_tx: self.outgoing_tx.clone(),
            capacity: self.capacity,
            closed: Arc::clone(&self.closed),
        }
    }

    /// Take one received snapshot directly, bypassing the subscribers
    pub fn poll_incoming(&self) -> Option<DeciderSnapshot> {
        self.incoming_rx.try_recv().ok()
    }
}

impl EngineTask for DistributedTcp {
    fn task_name(&self) -> &'static str {
        "distributed"
    }

    fn update(&mut self) -> CepFlowResult<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        let Ok(snapshot) = self.incoming_rx.try_recv() else {
            return Ok(false);
        };
        for subscriber in &self.subscribers {
            subscriber.on_distributed_update(snapshot.clone())?;
        }
        Ok(true)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        for thread in [
            self.sender_thread.take(),
            self.acceptor_thread.take(),
        ]
        .into_iter()
        .flatten()
        {
            if thread.join().is_err() {
                log::error!("distribution thread panicked");
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for DistributedTcp {
    fn drop(&mut self) {
        self.close();
    }
}

/// Egress handle onto the outgoing snapshot queue
#[derive(Clone)]
pub struct DistributedHandle {
    outgoing_tx: Sender<DeciderSnapshot>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

impl DeciderSubscriber for DistributedHandle {
    fn on_decider_update(
        &self,
        halted_complete: &[RunTuple],
        halted_incomplete: &[RunTuple],
        updated: &[RunTuple],
    ) -> CepFlowResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CepFlowError::closed("distributed"));
        }
        let snapshot = DeciderSnapshot {
            halted_complete: halted_complete.to_vec(),
            halted_incomplete: halted_incomplete.to_vec(),
            updated: updated.to_vec(),
        };
        if snapshot.is_empty() {
            return Ok(());
        }
        self.outgoing_tx
            .try_send(snapshot)
            .map_err(|_| CepFlowError::queue_full("distributed", self.capacity))
    }
}

#[allow(clippy::too_many_arguments)]
fn sender_loop(
    outgoing_rx: QueueReceiver<DeciderSnapshot>,
    roster: DeviceRoster,
    local_urn: String,
    local_id_key: String,
    crypto: Arc<FrameCrypto>,
    closed: Arc<AtomicBool>,
    connect_timeout: Duration,
    write_timeout: Duration,
) {
    while !closed.load(Ordering::SeqCst) {
        let snapshot = match outgoing_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(snapshot) => snapshot,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let message = PeerMessage::new(local_urn.clone(), local_id_key.clone(), snapshot);
        let frame = match message.encode().and_then(|text| crypto.wrap(&text)) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("failed to build outgoing frame: {e}");
                continue;
            }
        };
        for device in roster.others(&local_urn) {
            if let Err(e) = push_frame(device.socket_addr(), &frame, connect_timeout, write_timeout)
            {
                log::error!("push to '{}' at {} failed: {e}", device.urn, device.addr);
            }
        }
    }
}

fn push_frame(
    addr: SocketAddr,
    frame: &[u8],
    connect_timeout: Duration,
    write_timeout: Duration,
) -> CepFlowResult<()> {
    let mut stream = TcpStream::connect_timeout(&addr, connect_timeout)?;
    stream.set_write_timeout(Some(write_timeout))?;
    stream.write_all(frame)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn acceptor_loop(
    listener: TcpListener,
    roster: DeviceRoster,
    local_urn: String,
    crypto: Arc<FrameCrypto>,
    incoming_tx: Sender<DeciderSnapshot>,
    closed: Arc<AtomicBool>,
    read_timeout: Duration,
    recv_bytes: usize,
) {
    while !closed.load(Ordering::SeqCst) {
        let (stream, peer_addr) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
            Err(e) => {
                log::error!("accept failed: {e}");
                continue;
            }
        };
        if !roster.knows_addr(peer_addr.ip()) {
            log::warn!("rejected connection from unknown address {}", peer_addr.ip());
            continue;
        }
        match receive_snapshot(stream, peer_addr.ip(), &roster, &local_urn, &crypto, read_timeout, recv_bytes)
        {
            Ok(snapshot) => {
                if incoming_tx.try_send(snapshot).is_err() {
                    log::error!("incoming snapshot queue full, frame dropped");
                }
            }
            Err(e) => log::warn!("frame from {} rejected: {e}", peer_addr.ip()),
        }
    }
}

fn receive_snapshot(
    mut stream: TcpStream,
    peer_ip: IpAddr,
    roster: &DeviceRoster,
    local_urn: &str,
    crypto: &FrameCrypto,
    read_timeout: Duration,
    recv_bytes: usize,
) -> CepFlowResult<DeciderSnapshot> {
    stream.set_read_timeout(Some(read_timeout))?;
    let deadline = Instant::now() + read_timeout;
    let mut buffer = Vec::new();
    let mut chunk = vec![0u8; recv_bytes];

    loop {
        if Instant::now() > deadline {
            return Err(CepFlowError::timeout(format!(
                "no complete frame from {peer_ip} within {read_timeout:?}"
            )));
        }
        let n = match stream.read(&mut chunk) {
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Err(CepFlowError::timeout(format!(
                    "read from {peer_ip} exceeded {read_timeout:?}"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() >= MIN_FRAME_LENGTH && buffer.ends_with(FRAME_SENTINEL) {
            break;
        }
    }

    let text = crypto.unwrap(&buffer)?;
    let message = PeerMessage::decode(&text)?;
    if message.urn == local_urn {
        return Err(CepFlowError::system("frame echoes the local urn"));
    }
    let device = roster
        .by_urn(&message.urn)
        .ok_or_else(|| CepFlowError::system("frame names an unknown device"))?;
    if device.id_key != message.id_key {
        return Err(CepFlowError::system("frame id_key does not match the roster"));
    }
    Ok(message.snapshot)
}
