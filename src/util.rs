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
//! This module contains misc. utilities: noise generation, MAC address
//! handling and the host identity guesswork of the identity emitter.

use std::net::Ipv4Addr;
use hashbrown::HashMap;
use log::*;
use rand::Rng;


/// A normally distributed sample (Box-Muller).
pub fn gauss(mean: f64, sigma: f64) -> f64 {
    let mut rng = rand::thread_rng();
    let u1 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    mean + sigma * (-2. * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// The NetBIOS style host name: the hostname truncated at the first dot.
pub fn netbios_name() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "cs800sim".into())
        .split('.').next().expect("split is never empty").to_owned()
}

/// Parse `"AA-BB-CC-DD-EE-FF"` (or colon-separated) into MAC bytes.
pub fn parse_mac(text: &str) -> Option<[u8; 6]> {
    let mut mac = [0; 6];
    let mut parts = text.split(|c| c == '-' || c == ':');
    for byte in &mut mac {
        *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

pub fn format_mac(mac: [u8; 6]) -> String {
    mac.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join("-")
}

/// Network interfaces known to be internal, which never represent the
/// controller on the LAN.
fn is_internal_interface(name: &str) -> bool {
    name == "lo"
        || name.starts_with("Loopback")
        || name.starts_with("br-")
        || name.starts_with("Virtual")
        || name.starts_with("Bluetooth")
        || name.starts_with("docker")
}

/// Count established IPv4 connections per local address from /proc/net/tcp.
fn established_connections() -> HashMap<Ipv4Addr, usize> {
    let mut counts = HashMap::default();
    let Ok(table) = std::fs::read_to_string("/proc/net/tcp") else {
        return counts;
    };
    for line in table.lines().skip(1) {
        let mut fields = line.split_whitespace().skip(1);
        let (Some(local), Some(_remote), Some(state)) =
            (fields.next(), fields.next(), fields.next()) else { continue };
        // state 01 is ESTABLISHED
        if state != "01" {
            continue;
        }
        let Some(hex_ip) = local.split(':').next() else { continue };
        let Ok(raw) = u32::from_str_radix(hex_ip, 16) else { continue };
        // the kernel reports the address in host byte order
        let ip = Ipv4Addr::from(raw.swap_bytes());
        if ip.is_loopback() || ip.is_unspecified() || ip.is_link_local() {
            continue;
        }
        *counts.entry(ip).or_insert(0) += 1;
    }
    counts
}

/// Best-guess MAC address of this host: scan the interfaces, exclude
/// internal ones and those without a hardware address, and prefer the
/// interface with the most established IPv4 connections.
pub fn guess_mac() -> Option<[u8; 6]> {
    let connections = established_connections();
    let mut candidates: HashMap<String, ([u8; 6], usize)> = HashMap::default();

    let addrs = match nix::ifaddrs::getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            warn!("could not list network interfaces: {}", e);
            return None;
        }
    };
    for ifaddr in addrs {
        if is_internal_interface(&ifaddr.interface_name) {
            continue;
        }
        let Some(address) = ifaddr.address else { continue };
        let entry = candidates.entry(ifaddr.interface_name).or_default();
        if let Some(link) = address.as_link_addr() {
            if let Some(mac) = link.addr() {
                if mac != [0; 6] {
                    entry.0 = mac;
                }
            }
        } else if let Some(sin) = address.as_sockaddr_in() {
            entry.1 += connections.get(&Ipv4Addr::from(sin.ip())).copied().unwrap_or(0);
        }
    }

    candidates.into_iter()
              .filter(|(_, (mac, _))| *mac != [0; 6])
              .max_by_key(|&(_, (_, active))| active)
              .map(|(name, (mac, _))| {
                  debug!("announcing MAC {} of interface {}", format_mac(mac), name);
                  mac
              })
}
