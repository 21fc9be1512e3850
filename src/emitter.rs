// -----------------------------------------------------------------------------
// A network-level simulator for the Oxford Cryosystems CS800 controller.
//
// This program is free software; you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation; either version 2 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program; if not, write to the Free Software Foundation, Inc.,
// 59 Temple Place, Suite 330, Boston, MA  02111-1307  USA
//
// Module authors:
//   Georg Brandl <g.brandl@fz-juelich.de>
//
// -----------------------------------------------------------------------------
//
//! The two periodic broadcasters: identity announcements on port 30303 and
//! status frames on port 30304.

use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use log::*;
use crossbeam_channel::{select, tick, Receiver};

use crate::memory::ControllerMemory;
use crate::proto;

/// A datagram socket set up for broadcasting, with a short timeout so that
/// nothing here ever blocks for long.
fn broadcast_socket() -> io::Result<UdpSocket> {
    let sock = UdpSocket::bind(("0.0.0.0", 0))?;
    sock.set_broadcast(true)?;
    sock.set_read_timeout(Some(Duration::from_millis(200)))?;
    sock.set_write_timeout(Some(Duration::from_millis(200)))?;
    Ok(sock)
}

fn send_with_backoff(sock: &UdpSocket, packet: &[u8], target: &(String, u16)) {
    if let Err(e) = sock.send_to(packet, (target.0.as_str(), target.1)) {
        // transient: log it, back off, let the loop continue
        warn!("could not send to {}:{}: {}", target.0, target.1, e);
        thread::sleep(Duration::from_secs(1));
    }
}

/// Announces the NetBIOS name and MAC address, once per second.
pub struct IdentityEmitter {
    sock: UdpSocket,
    packet: Vec<u8>,
    target: (String, u16),
    interval: Duration,
}

impl IdentityEmitter {
    pub fn new(name: &str, mac: [u8; 6], target: (String, u16),
               interval: Duration) -> io::Result<Self> {
        Ok(IdentityEmitter {
            sock: broadcast_socket()?,
            packet: proto::encode_identity(name, mac),
            target, interval,
        })
    }

    pub fn run(self, stop: Receiver<()>) {
        mlzlog::set_thread_prefix("Identity: ");
        info!("announcing to {}:{}", self.target.0, self.target.1);
        let ticker = tick(self.interval);
        // announce immediately, then on every tick
        send_with_backoff(&self.sock, &self.packet, &self.target);
        loop {
            select! {
                recv(ticker) -> _ => send_with_backoff(&self.sock, &self.packet, &self.target),
                recv(stop) -> _ => break,
            }
        }
        info!("emitter finished");
    }
}

/// Broadcasts the controller status, once per second.
///
/// This is the only caller of the memory's simulation tick.
pub struct StatusEmitter {
    sock: UdpSocket,
    mem: Arc<ControllerMemory>,
    target: (String, u16),
    interval: Duration,
}

impl StatusEmitter {
    pub fn new(mem: Arc<ControllerMemory>, target: (String, u16),
               interval: Duration) -> io::Result<Self> {
        Ok(StatusEmitter { sock: broadcast_socket()?, mem, target, interval })
    }

    pub fn run(self, stop: Receiver<()>) {
        mlzlog::set_thread_prefix("Status: ");
        info!("broadcasting to {}:{}", self.target.0, self.target.1);
        let ticker = tick(self.interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    self.mem.tick();
                    let frame = proto::encode_status(&self.mem.snapshot());
                    debug!("frame of {} bytes, T = {:.2}", frame.len(),
                           self.mem.get("StatusGasTemp").unwrap_or(0.));
                    send_with_backoff(&self.sock, &frame, &self.target);
                },
                recv(stop) -> _ => break,
            }
        }
        info!("emitter finished");
    }
}
