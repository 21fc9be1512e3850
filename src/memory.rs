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
//! The in-memory image of the controller: parameter values, run mode, phase.
//!
//! The memory is the single structure shared between the workers.  The status
//! emitter snapshots it, the command worker mutates it, and the simulation
//! tick keeps the non-commanded parameters wiggling plausibly.

use hashbrown::HashMap;
use mlzutil::time::localtime;
use parking_lot::Mutex;

use crate::errors::{Error, Result};
use crate::params::{Phase, RunMode, WireKind, REGISTRY};
use crate::util::gauss;

/// Writes to the gas set-point are clamped to this range (Kelvin).
pub const SETPOINT_MIN: f64 = 80.;
pub const SETPOINT_MAX: f64 = 400.;

struct MemInner {
    values: HashMap<String, f64>,
    run_mode: RunMode,
    phase: Phase,
    status_format: u16,
    started: f64,
}

pub struct ControllerMemory {
    inner: Mutex<MemInner>,
    smoothing: f64,
    noise: f64,
}

impl ControllerMemory {
    pub fn new(smoothing: f64, noise: f64) -> Self {
        let values = REGISTRY.iter()
                             .map(|def| (def.name.clone(), def.default))
                             .collect();
        ControllerMemory {
            inner: Mutex::new(MemInner {
                values,
                run_mode: RunMode::Startup,
                phase: Phase::Hold,
                status_format: 0,
                started: localtime(),
            }),
            smoothing,
            noise,
        }
    }

    /// The noise amplitude, used by the phase machine as the set-point
    /// tolerance of the End/Purge phases.
    pub fn noise(&self) -> f64 {
        self.noise
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        self.inner.lock().values.get(name).copied()
            .ok_or_else(|| Error::unknown_param(name))
    }

    pub fn set(&self, name: &str, value: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        let slot = inner.values.get_mut(name).ok_or_else(|| Error::unknown_param(name))?;
        *slot = if name == "StatusGasSetPoint" {
            value.clamp(SETPOINT_MIN, SETPOINT_MAX)
        } else {
            value
        };
        Ok(())
    }

    pub fn run_mode(&self) -> RunMode {
        self.inner.lock().run_mode
    }

    /// Only a valid mode string is accepted.
    pub fn set_run_mode(&self, name: &str) -> Result<()> {
        let mode = RunMode::from_name(name)
            .ok_or_else(|| Error::invalid_state(format!("no such run mode: {}", name)))?;
        self.inner.lock().run_mode = mode;
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn set_phase(&self, phase: Phase) {
        self.inner.lock().phase = phase;
    }

    /// Set the phase from a wire ordinal; out-of-range ordinals leave the
    /// state unchanged.
    pub fn set_phase_ordinal(&self, ordinal: u16) -> Result<()> {
        let phase = Phase::from_ordinal(ordinal)
            .ok_or_else(|| Error::invalid_phase(format!("ordinal {}", ordinal)))?;
        self.inner.lock().phase = phase;
        Ok(())
    }

    pub fn status_format(&self) -> u16 {
        self.inner.lock().status_format
    }

    pub fn set_status_format(&self, format: u16) -> Result<()> {
        if !REGISTRY.is_known_format(format) {
            return Err(Error::range(format!("status format {}", format)));
        }
        self.inner.lock().status_format = format;
        Ok(())
    }

    /// Quantised `(id, value)` pairs of the current status format, in
    /// canonical order.  Taken under the lock, so readers never observe a
    /// torn write.
    pub fn snapshot(&self) -> Vec<(u16, u16)> {
        let inner = self.inner.lock();
        REGISTRY.format_params(inner.status_format).map(|def| {
            let value = match def.name.as_str() {
                "StatusRunMode" => inner.run_mode.ordinal().into(),
                "StatusPhaseId" => inner.phase.ordinal().into(),
                _ => inner.values[&def.name],
            };
            (def.id, def.kind.quantize(value))
        }).collect()
    }

    /// Advance the simulation by one step.  Called by the status emitter
    /// (and nobody else) before each broadcast.
    ///
    /// The gas temperature tracks the set-point through exponential
    /// smoothing; everything else that is not declared constant gets fresh
    /// placeholder values.  This is advertised wiggling data, not physics.
    pub fn tick(&self) {
        let mut inner = self.inner.lock();
        let setpoint = inner.values["StatusGasSetPoint"];
        let temp = inner.values["StatusGasTemp"];
        let smoothed = self.smoothing * setpoint + (1. - self.smoothing) * temp
            + gauss(0., self.noise);
        inner.values.insert("StatusGasTemp".into(), smoothed);

        let minutes = ((localtime() - inner.started) / 60.).floor();
        inner.values.insert("StatusRunTime".into(), minutes);

        for def in REGISTRY.iter() {
            if def.constant {
                continue;
            }
            let value = match def.kind {
                WireKind::Temperature => gauss(150., 5.),
                WireKind::Percentage => gauss(30., 5.),
                _ => gauss(500., 50.),
            };
            inner.values.insert(def.name.clone(), value.max(0.));
        }
    }
}
