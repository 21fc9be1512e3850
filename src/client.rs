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
//! Client-side access to the controller: discovery, status listening and
//! sending commands.
//!
//! These are the counterparts of the controller's three UDP interfaces and
//! consume exactly the wire formats of the `proto` module.

use std::net::{SocketAddr, UdpSocket};
use log::*;
use mlzutil::time::localtime;

use crate::errors::{Error, Result};
use crate::params::{Phase, RunMode, REGISTRY};
use crate::proto::{self, CmdKind, Identity};

/// Listens for identity broadcasts on port 30303.
pub struct Discoverer {
    sock: UdpSocket,
}

impl Discoverer {
    pub fn bind(port: u16) -> Result<Self> {
        let sock = UdpSocket::bind(("0.0.0.0", port))?;
        sock.set_broadcast(true)?;
        Ok(Discoverer { sock })
    }

    /// The next announcement, in either wire form.
    pub fn next(&self) -> Result<(SocketAddr, Identity)> {
        let mut buf = [0; 1024];
        let (len, addr) = self.sock.recv_from(&mut buf)?;
        let identity = proto::decode_identity(&buf[..len])?;
        Ok((addr, identity))
    }
}


/// One decoded status broadcast.
pub struct StatusReport {
    pub received: f64,
    pub source: SocketAddr,
    /// Dequantised values in wire order, by parameter name.
    pub values: Vec<(String, f64)>,
}

impl StatusReport {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).map(|&(_, v)| v)
    }

    pub fn run_mode(&self) -> Option<RunMode> {
        self.value("StatusRunMode").and_then(|v| RunMode::from_ordinal(v as u16))
    }

    pub fn phase(&self) -> Option<Phase> {
        self.value("StatusPhaseId").and_then(|v| Phase::from_ordinal(v as u16))
    }
}

/// Listens for status broadcasts on port 30304 and verifies their framing.
pub struct StatusListener {
    sock: UdpSocket,
}

impl StatusListener {
    pub fn bind(port: u16) -> Result<Self> {
        let sock = UdpSocket::bind(("0.0.0.0", port))?;
        sock.set_broadcast(true)?;
        Ok(StatusListener { sock })
    }

    /// The next well-formed status frame; out-of-spec frames are an error
    /// the caller is expected to log and skip.
    pub fn next(&self) -> Result<StatusReport> {
        let mut buf = [0; 4096];
        let (len, source) = self.sock.recv_from(&mut buf)?;
        let received = localtime();
        let values = proto::decode_status(&buf[..len])?
            .into_iter()
            .map(|(id, raw)| match REGISTRY.by_id(id) {
                Some(def) => (def.name.clone(), def.kind.dequantize(raw)),
                None => {
                    debug!("unknown parameter id {} from {}", id, source);
                    (format!("Param{}", id), raw.into())
                }
            })
            .collect();
        Ok(StatusReport { received, source, values })
    }
}


/// Sends commands to a specific controller.  The controller never replies.
///
/// Arguments are range-checked here as well; the controller silently drops
/// anything illegal, so catching mistakes early is all the feedback there is.
pub struct Commander {
    sock: UdpSocket,
    target: SocketAddr,
}

impl Commander {
    pub fn new(target: SocketAddr) -> Result<Self> {
        let sock = UdpSocket::bind(("0.0.0.0", 0))?;
        Ok(Commander { sock, target })
    }

    fn send(&self, kind: CmdKind, arg1: u16, arg2: u16) -> Result<()> {
        let msg = proto::encode_command(kind, arg1, arg2);
        debug!("sending {:?}({}, {}) to {}", kind, arg1, arg2, self.target);
        self.sock.send_to(&msg, self.target)?;
        Ok(())
    }

    /// Re-initialise a shut-down Cryostream back to Ready.
    pub fn restart(&self) -> Result<()> {
        self.send(CmdKind::Restart, 0, 0)
    }

    /// Ramp to `setpoint` K with `rate` K/h.
    pub fn ramp(&self, rate: f64, setpoint: f64) -> Result<()> {
        check_rate(rate)?;
        check_setpoint(setpoint)?;
        self.send(CmdKind::Ramp, rate.round() as u16, centikelvin(setpoint))
    }

    /// Hold the current temperature for `duration` minutes.
    pub fn plat(&self, duration: f64) -> Result<()> {
        if !(1. ..=1440.).contains(&duration) {
            return Err(Error::range(format!("duration {} not in 1..1440 min", duration)));
        }
        self.send(CmdKind::Plat, duration.round() as u16, 0)
    }

    pub fn hold(&self) -> Result<()> {
        self.send(CmdKind::Hold, 0, 0)
    }

    /// Cool to `setpoint` K as quickly as possible.
    pub fn cool(&self, setpoint: f64) -> Result<()> {
        check_setpoint(setpoint)?;
        self.send(CmdKind::Cool, centikelvin(setpoint), 0)
    }

    /// Ramp to 300 K with `rate` K/h, then shut down.
    pub fn end(&self, rate: f64) -> Result<()> {
        check_rate(rate)?;
        self.send(CmdKind::End, rate.round() as u16, 0)
    }

    pub fn purge(&self) -> Result<()> {
        self.send(CmdKind::Purge, 0, 0)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(CmdKind::Pause, 0, 0)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(CmdKind::Resume, 0, 0)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(CmdKind::Stop, 0, 0)
    }

    pub fn turbo(&self, on: bool) -> Result<()> {
        self.send(CmdKind::Turbo, on.into(), 0)
    }

    pub fn set_status_format(&self, format: u16) -> Result<()> {
        if !REGISTRY.is_known_format(format) {
            return Err(Error::range(format!("status format {}", format)));
        }
        self.send(CmdKind::SetStatusFormat, format, 0)
    }
}

fn centikelvin(setpoint: f64) -> u16 {
    (setpoint * 100. + 0.5) as u16
}

fn check_rate(rate: f64) -> Result<()> {
    if !(1. ..=360.).contains(&rate) {
        return Err(Error::range(format!("rate {} not in 1..360 K/h", rate)));
    }
    Ok(())
}

fn check_setpoint(setpoint: f64) -> Result<()> {
    // 400 K is the limit of the standard model (500 K for the "+")
    if !(80. ..=400.).contains(&setpoint) {
        return Err(Error::range(format!("setpoint {} not in 80..400 K", setpoint)));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn commander_checks_ranges() {
        let commander = Commander::new("127.0.0.1:39999".parse().unwrap()).unwrap();
        for result in [commander.ramp(0.5, 200.),
                       commander.ramp(361., 200.),
                       commander.ramp(60., 79.9),
                       commander.cool(410.),
                       commander.plat(0.),
                       commander.plat(2000.),
                       commander.end(0.),
                       commander.set_status_format(3)] {
            assert_eq!(*result.unwrap_err().kind(), ErrorKind::RangeViolation);
        }
        assert!(commander.ramp(1., 80.).is_ok());
        assert!(commander.plat(1440.).is_ok());
    }

    #[test]
    fn centikelvin_rounds() {
        assert_eq!(centikelvin(80.12345), 8012);
        assert_eq!(centikelvin(82.456789), 8246);
        assert_eq!(centikelvin(200.), 20000);
    }
}
