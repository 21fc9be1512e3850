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
//! Configuration file handling.
//!
//! Every entry has a default, so the simulator runs without any file.

use std::path::Path;
use serde_derive::Deserialize;

use crate::proto;

#[derive(Deserialize, Clone)]
pub struct SimConfig {
    /// NetBIOS name to announce; defaults to the host name.
    #[serde(default)]
    pub name: Option<String>,
    /// MAC address to announce ("AA-BB-CC-DD-EE-FF"); defaults to the
    /// best guess from the network interfaces.
    #[serde(default)]
    pub mac: Option<String>,
    /// Address the command socket binds to.
    #[serde(default = "d_bind")]
    pub bind: String,
    /// Where broadcasts are sent.
    #[serde(default = "d_broadcast")]
    pub broadcast: String,
    #[serde(default = "d_identity_port")]
    pub identity_port: u16,
    #[serde(default = "d_status_port")]
    pub status_port: u16,
    #[serde(default = "d_command_port")]
    pub command_port: u16,
    /// Broadcast cadence in seconds.
    #[serde(default = "d_interval")]
    pub interval: f64,
    /// Smoothing coefficient for the simulated gas temperature.
    #[serde(default = "d_smoothing")]
    pub smoothing: f64,
    /// Noise amplitude in K.
    #[serde(default = "d_noise")]
    pub noise: f64,
}

fn d_bind() -> String { "0.0.0.0".into() }
fn d_broadcast() -> String { "255.255.255.255".into() }
fn d_identity_port() -> u16 { proto::IDENTITY_PORT }
fn d_status_port() -> u16 { proto::STATUS_PORT }
fn d_command_port() -> u16 { proto::COMMAND_PORT }
fn d_interval() -> f64 { 1.0 }
fn d_smoothing() -> f64 { 0.5 }
fn d_noise() -> f64 { 0.1 }

impl Default for SimConfig {
    fn default() -> Self {
        toml::from_str("").expect("all fields have defaults")
    }
}

pub fn load_config(filename: impl AsRef<Path>) -> Result<SimConfig, String> {
    let data = std::fs::read(&filename).map_err(|e| e.to_string())?;
    let cfg: SimConfig = toml::from_slice(&data).map_err(|e| e.to_string())?;
    if !(0. ..=1.).contains(&cfg.smoothing) {
        return Err(format!("smoothing {} not in 0..1", cfg.smoothing));
    }
    if cfg.interval <= 0. {
        return Err(format!("interval {} must be positive", cfg.interval));
    }
    Ok(cfg)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.identity_port, 30303);
        assert_eq!(cfg.status_port, 30304);
        assert_eq!(cfg.command_port, 30305);
        assert_eq!(cfg.broadcast, "255.255.255.255");
        assert_eq!(cfg.interval, 1.0);
        assert!(cfg.name.is_none());
    }

    #[test]
    fn partial_file_overrides() {
        let cfg: SimConfig = toml::from_str(r#"
            name = "cryo1"
            status_port = 40304
            smoothing = 0.8
        "#).unwrap();
        assert_eq!(cfg.name.as_deref(), Some("cryo1"));
        assert_eq!(cfg.status_port, 40304);
        assert_eq!(cfg.smoothing, 0.8);
        assert_eq!(cfg.command_port, 30305);
    }
}
