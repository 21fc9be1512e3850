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
//! The simulator instance: owns the controller memory and spawns the three
//! workers (identity, status, command handling).

use std::error::Error as StdError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use log::*;
use crossbeam_channel::{bounded, unbounded, Sender};
use derive_new::new;

use crate::command::{run_machine, CommandReceiver, StateMachine};
use crate::config::SimConfig;
use crate::emitter::{IdentityEmitter, StatusEmitter};
use crate::memory::ControllerMemory;
use crate::util;

/// Fallback MAC (locally administered) if no interface yields one.
const FALLBACK_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0xC5, 0x80, 0x00];

#[derive(new)]
pub struct Simulator {
    config: SimConfig,
}

/// Keeps the simulator's threads alive; `stop` terminates all workers
/// and releases the sockets.
pub struct SimHandle {
    memory: Arc<ControllerMemory>,
    stop_flag: Arc<AtomicBool>,
    stop_senders: Vec<Sender<()>>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl SimHandle {
    /// The shared controller memory, for in-process inspection.
    pub fn memory(&self) -> &Arc<ControllerMemory> {
        &self.memory
    }

    pub fn stop(self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        for sender in &self.stop_senders {
            let _ = sender.send(());
        }
        for thread in self.threads {
            let _ = thread.join();
        }
        info!("all workers finished");
    }
}

impl Simulator {
    /// Start all workers and return a handle to stop them again.
    pub fn start(self) -> Result<SimHandle, Box<dyn StdError>> {
        let cfg = self.config;
        let mem = Arc::new(ControllerMemory::new(cfg.smoothing, cfg.noise));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let mut stop_senders = Vec::new();
        let mut threads = Vec::new();
        let mut stop_recv = || {
            let (tx, rx) = bounded(1);
            stop_senders.push(tx);
            rx
        };

        let name = cfg.name.clone().unwrap_or_else(util::netbios_name);
        let mac = match cfg.mac.as_deref() {
            Some(text) => util::parse_mac(text)
                .ok_or_else(|| format!("invalid MAC address in config: {}", text))?,
            None => util::guess_mac().unwrap_or_else(|| {
                warn!("no suitable network interface, announcing fallback MAC");
                FALLBACK_MAC
            }),
        };
        info!("controller identity: {} ({})", name, util::format_mac(mac));

        let interval = Duration::from_millis((cfg.interval * 1000.) as u64);

        let identity = IdentityEmitter::new(&name, mac,
                                            (cfg.broadcast.clone(), cfg.identity_port),
                                            interval)?;
        let rx = stop_recv();
        threads.push(thread::spawn(move || identity.run(rx)));

        let status = StatusEmitter::new(Arc::clone(&mem),
                                        (cfg.broadcast.clone(), cfg.status_port),
                                        interval)?;
        let rx = stop_recv();
        threads.push(thread::spawn(move || status.run(rx)));

        let (cmd_sender, cmd_receiver) = unbounded();
        let receiver = CommandReceiver::bind((cfg.bind.as_str(), cfg.command_port),
                                             cmd_sender, Arc::clone(&stop_flag))?;
        threads.push(thread::spawn(move || receiver.run()));

        let machine = StateMachine::new(Arc::clone(&mem));
        let rx = stop_recv();
        threads.push(thread::spawn(move || run_machine(machine, cmd_receiver, rx)));

        // the startup sequence the hardware goes through before it is ready
        let startup_mem = Arc::clone(&mem);
        threads.push(thread::spawn(move || {
            startup_mem.set_run_mode("Startup OK").expect("is a valid mode");
            thread::sleep(Duration::from_secs(1));
            startup_mem.set_run_mode("Run").expect("is a valid mode");
        }));

        Ok(SimHandle { memory: mem, stop_flag, stop_senders, threads })
    }
}
