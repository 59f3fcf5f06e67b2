//! UDP datagram link for the file-transfer sessions.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

use log::{info, warn};
use socket2::{Domain, Protocol, Socket, Type};

use nrc_core::{Error, MAX_PACKET_SIZE};
use nrc_hal::{DatagramLink, WallClock};

/// Non-blocking UDP socket, point-to-point.
///
/// A sender is constructed with its peer; a receiver binds without one and
/// locks onto whoever talks to it first.
pub struct UdpLink {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl UdpLink {
    pub fn new(bind_addr: &str, peer_addr: Option<&str>) -> anyhow::Result<Self> {
        let addr: SocketAddr = bind_addr.parse()?;
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        // Generous buffers: coded frames run to tens of kilobytes.
        let buf_size = 4 * 1024 * 1024;
        let _ = socket.set_recv_buffer_size(buf_size);
        let _ = socket.set_send_buffer_size(buf_size);
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let peer = match peer_addr {
            Some(p) => Some(p.parse::<SocketAddr>()?),
            None => None,
        };

        Ok(Self {
            socket: socket.into(),
            peer,
        })
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl DatagramLink for UdpLink {
    fn send(&mut self, frame: &[u8]) -> nb::Result<usize, Error> {
        let Some(peer) = self.peer else {
            // No peer yet; nothing sensible to do with the frame.
            return Ok(0);
        };
        if frame.len() > MAX_PACKET_SIZE {
            warn!(
                "datagram of {} bytes exceeds the nominal {MAX_PACKET_SIZE}-byte cap",
                frame.len()
            );
        }
        match self.socket.send_to(frame, peer) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Err(nb::Error::WouldBlock),
            Err(_) => Err(nb::Error::Other(Error::Link("udp send failed"))),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> nb::Result<usize, Error> {
        match self.socket.recv_from(buf) {
            Ok((n, src)) => {
                if self.peer.is_none() {
                    info!("peer locked: {src}");
                    self.peer = Some(src);
                }
                Ok(n)
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Err(nb::Error::WouldBlock),
            Err(_) => Err(nb::Error::Other(Error::Link("udp recv failed"))),
        }
    }
}

/// Milliseconds since construction.
pub struct SystemClock(Instant);

impl SystemClock {
    pub fn new() -> Self {
        Self(Instant::now())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}
