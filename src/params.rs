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
//! The static parameter registry and the controller enumerations.
//!
//! The registry maps each parameter name to its 16-bit ID and its wire type,
//! and is shared between the emitter and the listeners.  It is loaded from
//! `params.toml`, whose file order is the canonical order of status packets.

use std::fmt;
use hashbrown::HashMap;
use lazy_static::lazy_static;
use serde_derive::Deserialize;


lazy_static! {
    /// The single registry instance, compiled in from `params.toml`.
    pub static ref REGISTRY: Registry =
        Registry::parse(include_str!("../params.toml")).expect("valid parameter registry");
}

/// How a parameter value is represented on the wire.
#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum WireKind {
    /// Kelvin, held as K × 100 on the wire.
    Temperature,
    /// 0 - 100.
    Percentage,
    /// Index into one of the enumerations below.
    Enumeration,
    /// Plain 16-bit integer (minutes, K/h, serial numbers, codes).
    Plain,
}

impl WireKind {
    /// Quantise a value for the 16-bit wire representation.
    pub fn quantize(&self, value: f64) -> u16 {
        let scaled = match self {
            WireKind::Temperature => value * 100.,
            _ => value,
        };
        (scaled + 0.5).clamp(0., 65535.) as u16
    }

    /// Undo `quantize` into engineering units.
    pub fn dequantize(&self, raw: u16) -> f64 {
        match self {
            WireKind::Temperature => f64::from(raw) / 100.,
            _ => raw.into(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct ParamDef {
    pub name: String,
    pub id: u16,
    pub kind: WireKind,
    /// Immune to the randomizing part of the simulation tick.
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub default: f64,
}

#[derive(Deserialize)]
struct ParamFile {
    param: Vec<ParamDef>,
}

pub struct Registry {
    defs: Vec<ParamDef>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<u16, usize>,
}

impl Registry {
    fn parse(text: &str) -> Result<Registry, String> {
        let file: ParamFile = toml::from_str(text).map_err(|e| e.to_string())?;
        let mut by_name = HashMap::default();
        let mut by_id = HashMap::default();
        for (index, def) in file.param.iter().enumerate() {
            if by_name.insert(def.name.clone(), index).is_some() {
                return Err(format!("parameter name {} is not unique", def.name));
            }
            if by_id.insert(def.id, index).is_some() {
                return Err(format!("parameter id {} is not unique", def.id));
            }
        }
        Ok(Registry { defs: file.param, by_name, by_id })
    }

    pub fn get(&self, name: &str) -> Option<&ParamDef> {
        self.by_name.get(name).map(|&i| &self.defs[i])
    }

    pub fn by_id(&self, id: u16) -> Option<&ParamDef> {
        self.by_id.get(&id).map(|&i| &self.defs[i])
    }

    /// All parameters, in canonical wire order.
    pub fn iter(&self) -> impl Iterator<Item = &ParamDef> {
        self.defs.iter()
    }

    /// The parameters of a given status packet format, in wire order.
    ///
    /// Format 0, the default, reports the whole table including the
    /// `SetUp`/`Device` constants; format 1 is the reduced selection of
    /// live `Status` parameters.
    pub fn format_params(&self, format: u16) -> impl Iterator<Item = &ParamDef> {
        self.defs.iter().filter(move |def| format == 0 || def.name.starts_with("Status"))
    }

    pub fn is_known_format(&self, format: u16) -> bool {
        format <= 1
    }
}


/// Top-level device lifecycle state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunMode {
    Startup,
    StartupFail,
    StartupOk,
    Run,
    Setup,
    ShutdownOk,
    ShutdownFail,
}

impl RunMode {
    pub fn name(self) -> &'static str {
        match self {
            RunMode::Startup => "Startup",
            RunMode::StartupFail => "Startup Fail",
            RunMode::StartupOk => "Startup OK",
            RunMode::Run => "Run",
            RunMode::Setup => "Setup",
            RunMode::ShutdownOk => "Shutdown OK",
            RunMode::ShutdownFail => "Shutdown Fail",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Startup" => RunMode::Startup,
            "Startup Fail" => RunMode::StartupFail,
            "Startup OK" => RunMode::StartupOk,
            "Run" => RunMode::Run,
            "Setup" => RunMode::Setup,
            "Shutdown OK" => RunMode::ShutdownOk,
            "Shutdown Fail" => RunMode::ShutdownFail,
            _ => return None,
        })
    }

    pub fn ordinal(self) -> u16 {
        self as u16
    }

    pub fn from_ordinal(ord: u16) -> Option<Self> {
        use self::RunMode::*;
        [Startup, StartupFail, StartupOk, Run, Setup, ShutdownOk, ShutdownFail]
            .get(ord as usize).copied()
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The currently executing cryostream activity.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Ramp,
    Cool,
    Plat,
    Hold,
    End,
    Purge,
    DeletePhase,
    LoadProgram,
    SaveProgram,
    Soak,
    Wait,
}

impl Phase {
    pub const COUNT: u16 = 11;

    pub fn name(self) -> &'static str {
        match self {
            Phase::Ramp => "Ramp",
            Phase::Cool => "Cool",
            Phase::Plat => "Plat",
            Phase::Hold => "Hold",
            Phase::End => "End",
            Phase::Purge => "Purge",
            Phase::DeletePhase => "Delete Phase",
            Phase::LoadProgram => "Load Program",
            Phase::SaveProgram => "Save Program",
            Phase::Soak => "Soak",
            Phase::Wait => "Wait",
        }
    }

    pub fn ordinal(self) -> u16 {
        self as u16
    }

    pub fn from_ordinal(ord: u16) -> Option<Self> {
        use self::Phase::*;
        [Ramp, Cool, Plat, Hold, End, Purge, DeletePhase,
         LoadProgram, SaveProgram, Soak, Wait].get(ord as usize).copied()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Turbo mode on the wire: OFF=0, ON=1.
pub const TURBO_OFF: u16 = 0;
pub const TURBO_ON: u16 = 1;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_consistent() {
        // every advertised ID has exactly one entry, and lookups agree
        for def in REGISTRY.iter() {
            assert_eq!(REGISTRY.get(&def.name).unwrap().id, def.id);
            assert_eq!(REGISTRY.by_id(def.id).unwrap().name, def.name);
        }
        assert!(REGISTRY.get("StatusGasTemp").is_some());
        assert!(REGISTRY.get("NoSuchParam").is_none());
    }

    #[test]
    fn default_format_reports_the_whole_table() {
        assert_eq!(REGISTRY.format_params(0).count(), REGISTRY.iter().count());
        assert!(REGISTRY.format_params(0).any(|d| d.name == "SetUpControllerNumber"));
        // format 1 is the reduced live-parameter selection
        assert!(REGISTRY.format_params(1).all(|d| d.name.starts_with("Status")));
        assert!(REGISTRY.format_params(1).count() < REGISTRY.format_params(0).count());
    }

    #[test]
    fn quantization() {
        assert_eq!(WireKind::Temperature.quantize(200.), 20000);
        assert_eq!(WireKind::Temperature.quantize(81.123), 8112);
        assert_eq!(WireKind::Temperature.quantize(999999.), 65535);
        assert_eq!(WireKind::Temperature.quantize(-4.), 0);
        assert_eq!(WireKind::Plain.quantize(360.2), 360);
        assert_eq!(WireKind::Temperature.dequantize(20000), 200.);
    }

    #[test]
    fn enumerant_conversions() {
        assert_eq!(RunMode::from_name("Shutdown OK"), Some(RunMode::ShutdownOk));
        assert_eq!(RunMode::from_name("shutdown"), None);
        assert_eq!(RunMode::from_ordinal(3), Some(RunMode::Run));
        assert_eq!(RunMode::from_ordinal(7), None);
        assert_eq!(Phase::from_ordinal(10), Some(Phase::Wait));
        assert_eq!(Phase::from_ordinal(Phase::COUNT), None);
        assert_eq!(Phase::Hold.ordinal(), 3);
        assert_eq!(Phase::DeletePhase.name(), "Delete Phase");
    }
}
