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
//! Command reception and the phase state machine.
//!
//! Two cooperating loops: a blocking receive loop that decodes datagrams
//! from port 30305 and hands them over a channel, and an event loop that
//! advances the active phase every 100 ms and dequeues at most one pending
//! command per second.
//!
//! Unrecognised, illegal or inappropriate commands are simply ignored, as
//! on the real hardware.

use std::collections::VecDeque;
use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use log::*;
use crossbeam_channel::{select, tick, Receiver, Sender};
use mlzutil::time::localtime;

use crate::errors::Result;
use crate::memory::ControllerMemory;
use crate::params::{Phase, REGISTRY};
use crate::proto::{self, CmdKind, Command};

/// Ramp rate used for COOL, PURGE and the fastest possible approach (K/h).
const FULL_RATE: f64 = 360.;
/// Gas temperature END and PURGE drive towards (K).
const WARMUP_TEMP: f64 = 300.;

/// The activity advanced by one handler step per event-loop tick.
///
/// Each in-flight variant corresponds to exactly one `Phase` enumerant;
/// `Idle` is displayed as `Hold`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ActivePhase {
    Idle,
    Cool,
    Ramp,
    Plat,
    End,
    Purge,
}

impl ActivePhase {
    fn phase(self) -> Phase {
        match self {
            ActivePhase::Idle => Phase::Hold,
            ActivePhase::Cool => Phase::Cool,
            ActivePhase::Ramp => Phase::Ramp,
            ActivePhase::Plat => Phase::Plat,
            ActivePhase::End => Phase::End,
            ActivePhase::Purge => Phase::Purge,
        }
    }
}

struct Paused {
    active: ActivePhase,
    at: f64,
}

pub struct StateMachine {
    mem: Arc<ControllerMemory>,
    queue: VecDeque<Command>,
    active: ActivePhase,
    paused: Option<Paused>,
    /// Wall time at which the current phase is due to complete.
    target_time: f64,
}

impl StateMachine {
    pub fn new(mem: Arc<ControllerMemory>) -> Self {
        StateMachine { mem, queue: VecDeque::new(), active: ActivePhase::Idle,
                       paused: None, target_time: 0. }
    }

    /// Take delivery of a decoded command.
    ///
    /// HOLD, PAUSE and RESUME act immediately; everything else is queued
    /// for the event loop, unless currently paused.
    pub fn handle(&mut self, cmd: Command, now: f64) {
        info!("command from {}: {:?}({}, {})", cmd.source, cmd.kind, cmd.arg1, cmd.arg2);
        match cmd.kind {
            CmdKind::Hold => self.do_hold(),
            CmdKind::Pause => {
                if self.paused.is_none() {
                    self.do_pause(now);
                } else {
                    debug!("already paused, PAUSE ignored");
                }
            }
            CmdKind::Resume => {
                if self.paused.is_some() {
                    self.do_resume(now);
                } else {
                    debug!("not paused, RESUME ignored");
                }
            }
            _ if self.paused.is_some() => {
                debug!("paused, {:?} dropped", cmd.kind);
            }
            _ => {
                if let Err(e) = check_ranges(&cmd) {
                    debug!("{:?} dropped: {}", cmd.kind, e);
                } else {
                    self.queue.push_back(cmd);
                }
            }
        }
    }

    /// Start the next queued command, if the machine is idle.  Called
    /// about once per second.
    pub fn dequeue(&mut self, now: f64) {
        if self.paused.is_some() || self.active != ActivePhase::Idle {
            return;
        }
        if let Some(cmd) = self.queue.pop_front() {
            self.start(cmd, now);
        }
    }

    /// Advance the active handler by one step.  Called every 100 ms.
    pub fn tick(&mut self, now: f64) {
        if self.paused.is_some() {
            return;
        }
        match self.active {
            ActivePhase::Idle => (),
            ActivePhase::Cool => self.step_cool(now),
            ActivePhase::Ramp => self.step_ramp(now),
            ActivePhase::Plat => self.step_plat(now),
            ActivePhase::End | ActivePhase::Purge => self.step_end(now),
        }
    }

    fn get(&self, param: &str) -> f64 {
        self.mem.get(param).expect("is in registry")
    }

    fn set(&self, param: &str, value: f64) {
        self.mem.set(param, value).expect("is in registry");
    }

    fn set_remaining(&self, time_left: f64) {
        self.set("StatusRemaining", ((time_left / 60.) + 0.5).floor().max(0.));
    }

    fn enter(&mut self, active: ActivePhase, due: f64) {
        self.active = active;
        self.target_time = due;
        self.mem.set_phase(active.phase());
    }

    fn start(&mut self, cmd: Command, now: f64) {
        let temp = self.get("StatusGasTemp");
        match cmd.kind {
            CmdKind::Cool => {
                let target = f64::from(cmd.arg1) / 100.;
                if target >= temp {
                    debug!("COOL to {} ignored: can only cool down from {:.2}", target, temp);
                    return;
                }
                self.set("StatusRampRate", FULL_RATE);
                self.set("StatusTargetTemp", target);
                self.enter(ActivePhase::Cool, now + (temp - target) / FULL_RATE * 3600.);
            }
            CmdKind::Ramp => {
                let rate = f64::from(cmd.arg1);
                let target = f64::from(cmd.arg2) / 100.;
                if target <= temp {
                    debug!("RAMP to {} ignored: can only ramp up from {:.2}", target, temp);
                    return;
                }
                self.set("StatusRampRate", rate);
                self.set("StatusTargetTemp", target);
                self.enter(ActivePhase::Ramp, now + (target - temp) / rate * 3600.);
            }
            CmdKind::Plat => {
                // plateau holds the current set-point, which becomes the target
                let setpoint = self.get("StatusGasSetPoint");
                self.set("StatusTargetTemp", setpoint);
                self.enter(ActivePhase::Plat, now + f64::from(cmd.arg1) * 60.);
            }
            CmdKind::End | CmdKind::Purge => {
                let rate = if cmd.kind == CmdKind::End { f64::from(cmd.arg1) } else { FULL_RATE };
                self.set("StatusRampRate", rate);
                self.set("StatusTargetTemp", WARMUP_TEMP);
                self.set("StatusGasSetPoint", WARMUP_TEMP);
                let active = if cmd.kind == CmdKind::End { ActivePhase::End }
                             else { ActivePhase::Purge };
                self.enter(active, now + (WARMUP_TEMP - temp).abs() / rate * 3600.);
            }
            CmdKind::Stop => {
                self.mem.set_run_mode("Shutdown OK").expect("is a valid mode");
            }
            CmdKind::Restart => {
                self.mem.set_run_mode("Startup OK").expect("is a valid mode");
            }
            CmdKind::Turbo => {
                self.set("StatusTurboMode", cmd.arg1.into());
            }
            CmdKind::SetStatusFormat => {
                self.mem.set_status_format(cmd.arg1).expect("checked on receipt");
            }
            // handled on receipt, never queued
            CmdKind::Hold | CmdKind::Pause | CmdKind::Resume => (),
        }
    }

    /// Ramp time is over or the set point was reached: snap the set-point
    /// to the target and go back to idle.
    fn finish(&mut self) {
        self.set("StatusGasSetPoint", self.get("StatusTargetTemp"));
        self.set_remaining(0.);
        self.active = ActivePhase::Idle;
        self.mem.set_phase(Phase::Hold);
    }

    fn step_ramp(&mut self, now: f64) {
        let time_left = self.target_time - now;
        self.set_remaining(time_left);
        let target = self.get("StatusTargetTemp");
        let rate = self.get("StatusRampRate");
        if time_left < 0. || self.get("StatusGasTemp") >= target {
            self.finish();
            return;
        }
        // interpolate for a smooth trajectory up to the target
        self.set("StatusGasSetPoint", target - time_left * rate / 3600.);
    }

    fn step_cool(&mut self, now: f64) {
        let time_left = self.target_time - now;
        self.set_remaining(time_left);
        let target = self.get("StatusTargetTemp");
        let rate = self.get("StatusRampRate");
        if time_left < 0. || self.get("StatusGasTemp") <= target {
            self.finish();
            return;
        }
        self.set("StatusGasSetPoint", target + time_left * rate / 3600.);
    }

    fn step_plat(&mut self, now: f64) {
        let time_left = self.target_time - now;
        self.set_remaining(time_left);
        if time_left < 0. {
            self.finish();
        }
    }

    fn step_end(&mut self, now: f64) {
        let target = self.get("StatusTargetTemp");
        let rate = self.get("StatusRampRate");
        let temp = self.get("StatusGasTemp");
        self.set_remaining((target - temp).abs() / rate * 3600.);
        if temp >= target - self.mem.noise() || now > self.target_time {
            self.finish();
            // the observed shutdown-then-restart cycle of the hardware
            self.queue = VecDeque::from([
                Command::internal(CmdKind::Stop, 0, now),
                Command::internal(CmdKind::Plat, 1, now),
                Command::internal(CmdKind::Restart, 0, now),
            ]);
        }
    }

    /// Stay at the current temperature indefinitely, with no ability to
    /// resume; disables any further queued commands.
    fn do_hold(&mut self) {
        self.queue.clear();
        self.paused = None;
        self.set("StatusGasSetPoint", self.get("StatusGasTemp"));
        self.set("StatusRemaining", 0.);
        self.active = ActivePhase::Idle;
        self.mem.set_phase(Phase::Hold);
    }

    fn do_pause(&mut self, now: f64) {
        self.paused = Some(Paused { active: self.active, at: now });
        self.mem.set_phase(Phase::Wait);
    }

    fn do_resume(&mut self, now: f64) {
        if let Some(paused) = self.paused.take() {
            self.target_time += now - paused.at;
            self.active = paused.active;
            self.mem.set_phase(paused.active.phase());
        }
    }

    #[cfg(test)]
    fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// Argument range checks.  They are duplicated on the commander side; here
/// they decide whether a decoded packet is dropped.
fn check_ranges(cmd: &Command) -> Result<()> {
    use crate::errors::Error;
    let range = |value: u16, lo: u16, hi: u16, what: &str| {
        if value < lo || value > hi {
            Err(Error::range(format!("{} {} not in {}..{}", what, value, lo, hi)))
        } else {
            Ok(())
        }
    };
    match cmd.kind {
        CmdKind::Ramp => {
            range(cmd.arg1, 1, 360, "rate")?;
            range(cmd.arg2, 8000, 40000, "target")
        }
        CmdKind::Cool => range(cmd.arg1, 8000, 40000, "target"),
        CmdKind::Plat => range(cmd.arg1, 1, 1440, "duration"),
        CmdKind::End => range(cmd.arg1, 1, 360, "rate"),
        CmdKind::Turbo => range(cmd.arg1, 0, 1, "mode"),
        CmdKind::SetStatusFormat => {
            if REGISTRY.is_known_format(cmd.arg1) {
                Ok(())
            } else {
                Err(Error::range(format!("status format {}", cmd.arg1)))
            }
        }
        _ => Ok(()),
    }
}


/// The blocking receive loop.  Packet-level errors are counted and dropped;
/// socket errors do not stop the loop.
pub struct CommandReceiver {
    sock: UdpSocket,
    sender: Sender<Command>,
    stop: Arc<AtomicBool>,
}

impl CommandReceiver {
    pub fn bind(addr: (&str, u16), sender: Sender<Command>,
                stop: Arc<AtomicBool>) -> io::Result<Self> {
        let sock = UdpSocket::bind(addr)?;
        sock.set_broadcast(true)?;
        // short timeout so shutdown is noticed without a packet arriving
        sock.set_read_timeout(Some(Duration::from_millis(200)))?;
        Ok(CommandReceiver { sock, sender, stop })
    }

    pub fn run(self) {
        mlzlog::set_thread_prefix("Commands: ");
        info!("listening on port {}", self.sock.local_addr().map(|a| a.port()).unwrap_or(0));
        let mut buf = [0; 1024];
        let mut dropped = 0u64;
        while !self.stop.load(Ordering::Relaxed) {
            match self.sock.recv_from(&mut buf) {
                Ok((len, addr)) => {
                    match proto::decode_command(&buf[..len], localtime(), addr.ip()) {
                        Ok(cmd) => if self.sender.send(cmd).is_err() {
                            break;
                        },
                        Err(e) => {
                            dropped += 1;
                            debug!("dropped packet from {} ({} so far): {}", addr, dropped, e);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock ||
                          e.kind() == io::ErrorKind::TimedOut => (),
                Err(e) => {
                    warn!("error in recv: {}", e);
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
        info!("receiver finished");
    }
}

/// The event loop around the state machine.
pub fn run_machine(mut machine: StateMachine, commands: Receiver<Command>,
                   stop: Receiver<()>) {
    mlzlog::set_thread_prefix("Machine: ");
    info!("event loop started ...");
    let handler_tick = tick(Duration::from_millis(100));
    let dequeue_tick = tick(Duration::from_secs(1));
    loop {
        select! {
            recv(commands) -> res => match res {
                Ok(cmd) => machine.handle(cmd, localtime()),
                Err(_) => break,
            },
            recv(handler_tick) -> _ => machine.tick(localtime()),
            recv(dequeue_tick) -> _ => machine.dequeue(localtime()),
            recv(stop) -> _ => break,
        }
    }
    info!("event loop finished");
}


#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use super::*;
    use crate::params::{RunMode, TURBO_ON};

    const T0: f64 = 1_500_000_000.;

    fn setup(temp: f64) -> (Arc<ControllerMemory>, StateMachine) {
        let mem = Arc::new(ControllerMemory::new(0.5, 0.1));
        mem.set("StatusGasTemp", temp).unwrap();
        mem.set("StatusGasSetPoint", temp).unwrap();
        let machine = StateMachine::new(Arc::clone(&mem));
        (mem, machine)
    }

    fn cmd(kind: CmdKind, arg1: u16, arg2: u16) -> Command {
        Command { kind, arg1, arg2, received: T0,
                  source: IpAddr::V4(Ipv4Addr::LOCALHOST) }
    }

    #[test]
    fn ramp_progression() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Ramp, 60, 20000), T0);
        machine.dequeue(T0);
        assert_eq!(mem.phase(), Phase::Ramp);
        assert_eq!(mem.get("StatusTargetTemp").unwrap(), 200.);
        assert_eq!(mem.get("StatusRampRate").unwrap(), 60.);

        // 50 K at 60 K/h: due in 3000 s
        let mut last_sp = mem.get("StatusGasSetPoint").unwrap();
        machine.tick(T0 + 1.);
        let first_remaining = mem.get("StatusRemaining").unwrap();
        for secs in 2..=60 {
            machine.tick(T0 + f64::from(secs));
            let sp = mem.get("StatusGasSetPoint").unwrap();
            assert!(sp > last_sp, "set-point not increasing at t+{}", secs);
            last_sp = sp;
        }
        assert_eq!(mem.phase(), Phase::Ramp);
        assert!(mem.get("StatusRemaining").unwrap() < first_remaining);
    }

    #[test]
    fn ramp_terminal_snap_on_timeout() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Ramp, 60, 20000), T0);
        machine.dequeue(T0);
        machine.tick(T0 + 3000.1);
        assert_eq!(mem.phase(), Phase::Hold);
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(), 200.);
        assert_eq!(mem.get("StatusRemaining").unwrap(), 0.);
    }

    #[test]
    fn ramp_terminal_snap_on_crossing() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Ramp, 60, 20000), T0);
        machine.dequeue(T0);
        mem.set("StatusGasTemp", 200.5).unwrap();
        machine.tick(T0 + 5.);
        assert_eq!(mem.phase(), Phase::Hold);
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(), 200.);
    }

    #[test]
    fn cool_monotonic_and_bounded() {
        let (mem, mut machine) = setup(300.);
        machine.handle(cmd(CmdKind::Cool, 15000, 0), T0);
        machine.dequeue(T0);
        assert_eq!(mem.phase(), Phase::Cool);
        assert_eq!(mem.get("StatusRampRate").unwrap(), 360.);

        // 150 K at 360 K/h: due in 1500 s
        let mut last_sp = mem.get("StatusGasSetPoint").unwrap();
        for secs in 1..1500 {
            machine.tick(T0 + f64::from(secs) * 10.);
            if mem.phase() != Phase::Cool {
                break;
            }
            let sp = mem.get("StatusGasSetPoint").unwrap();
            assert!(sp < last_sp);
            // per-step decrease bounded by the full rate
            assert!(last_sp - sp <= 360. / 3600. * 10. + 1e-9);
            last_sp = sp;
        }
        machine.tick(T0 + 1501.);
        assert_eq!(mem.phase(), Phase::Hold);
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(), 150.);
    }

    #[test]
    fn cool_up_and_ramp_down_are_ignored() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Cool, 20000, 0), T0);
        machine.dequeue(T0 + 1.);
        assert_eq!(mem.phase(), Phase::Hold);
        machine.handle(cmd(CmdKind::Ramp, 60, 10000), T0 + 2.);
        machine.dequeue(T0 + 3.);
        assert_eq!(mem.phase(), Phase::Hold);
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(), 150.);
    }

    #[test]
    fn pause_resume_shifts_target_time() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Ramp, 60, 20000), T0);
        machine.dequeue(T0);
        machine.tick(T0 + 10.);
        let sp_at_pause = mem.get("StatusGasSetPoint").unwrap();

        machine.handle(cmd(CmdKind::Pause, 0, 0), T0 + 10.);
        assert_eq!(mem.phase(), Phase::Wait);
        // handler is frozen while paused
        machine.tick(T0 + 500.);
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(), sp_at_pause);

        machine.handle(cmd(CmdKind::Resume, 0, 0), T0 + 510.);
        assert_eq!(mem.phase(), Phase::Ramp);
        // the deadline moved by exactly the pause duration, so one tick at
        // the same relative position reproduces the same set-point
        machine.tick(T0 + 510.);
        assert!((mem.get("StatusGasSetPoint").unwrap() - sp_at_pause).abs() < 1e-9);
    }

    #[test]
    fn pause_and_resume_extras_are_noops() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Resume, 0, 0), T0);
        assert_eq!(mem.phase(), Phase::Hold);

        machine.handle(cmd(CmdKind::Pause, 0, 0), T0 + 1.);
        assert_eq!(mem.phase(), Phase::Wait);
        machine.handle(cmd(CmdKind::Pause, 0, 0), T0 + 2.);
        assert_eq!(mem.phase(), Phase::Wait);
        // pausing from idle resumes back to idle
        machine.handle(cmd(CmdKind::Resume, 0, 0), T0 + 3.);
        assert_eq!(mem.phase(), Phase::Hold);
    }

    #[test]
    fn commands_are_dropped_while_paused() {
        let (_, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Pause, 0, 0), T0);
        machine.handle(cmd(CmdKind::Plat, 5, 0), T0 + 1.);
        assert_eq!(machine.queue_len(), 0);
    }

    #[test]
    fn hold_clears_queue() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Ramp, 60, 20000), T0);
        machine.dequeue(T0);
        machine.handle(cmd(CmdKind::Ramp, 10, 25000), T0 + 1.);
        machine.handle(cmd(CmdKind::Cool, 10000, 0), T0 + 2.);
        assert_eq!(machine.queue_len(), 2);

        machine.handle(cmd(CmdKind::Hold, 0, 0), T0 + 3.);
        assert_eq!(machine.queue_len(), 0);
        assert_eq!(mem.phase(), Phase::Hold);
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(),
                   mem.get("StatusGasTemp").unwrap());
        assert_eq!(mem.get("StatusRemaining").unwrap(), 0.);
    }

    #[test]
    fn plat_holds_for_duration() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Plat, 2, 0), T0);
        machine.dequeue(T0);
        assert_eq!(mem.phase(), Phase::Plat);
        machine.tick(T0 + 60.);
        assert_eq!(mem.phase(), Phase::Plat);
        assert_eq!(mem.get("StatusRemaining").unwrap(), 1.);
        machine.tick(T0 + 120.5);
        assert_eq!(mem.phase(), Phase::Hold);
        // the plateau held the current set-point; the snap is a no-op
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(), 150.);
    }

    #[test]
    fn end_runs_the_shutdown_cycle() {
        let (mem, mut machine) = setup(300.);
        machine.handle(cmd(CmdKind::End, 360, 0), T0);
        machine.dequeue(T0);
        assert_eq!(mem.phase(), Phase::End);
        assert_eq!(mem.get("StatusGasSetPoint").unwrap(), 300.);

        // already at 300 K: the phase completes and queues STOP, PLAT(1), RESTART
        machine.tick(T0 + 0.1);
        assert_eq!(mem.phase(), Phase::Hold);
        assert_eq!(machine.queue_len(), 3);

        machine.dequeue(T0 + 1.);
        assert_eq!(mem.run_mode(), RunMode::ShutdownOk);
        machine.dequeue(T0 + 2.);
        assert_eq!(mem.phase(), Phase::Plat);
        machine.tick(T0 + 63.);
        assert_eq!(mem.phase(), Phase::Hold);
        machine.dequeue(T0 + 63.);
        assert_eq!(mem.run_mode(), RunMode::StartupOk);
    }

    #[test]
    fn purge_acts_like_end() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Purge, 0, 0), T0);
        machine.dequeue(T0);
        assert_eq!(mem.phase(), Phase::Purge);
        assert_eq!(mem.get("StatusTargetTemp").unwrap(), 300.);
        // temperature still cold: keeps going
        machine.tick(T0 + 1.);
        assert_eq!(mem.phase(), Phase::Purge);
        mem.set("StatusGasTemp", 300.).unwrap();
        machine.tick(T0 + 2.);
        assert_eq!(mem.phase(), Phase::Hold);
    }

    #[test]
    fn out_of_range_commands_are_dropped() {
        let (_, mut machine) = setup(150.);
        for bad in [cmd(CmdKind::Ramp, 0, 20000),
                    cmd(CmdKind::Ramp, 400, 20000),
                    cmd(CmdKind::Ramp, 60, 45000),
                    cmd(CmdKind::Cool, 5000, 0),
                    cmd(CmdKind::Plat, 0, 0),
                    cmd(CmdKind::Plat, 2000, 0),
                    cmd(CmdKind::End, 0, 0),
                    cmd(CmdKind::Turbo, 2, 0),
                    cmd(CmdKind::SetStatusFormat, 9, 0)] {
            machine.handle(bad, T0);
        }
        assert_eq!(machine.queue_len(), 0);
    }

    #[test]
    fn turbo_and_status_format() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Turbo, TURBO_ON, 0), T0);
        machine.dequeue(T0);
        assert_eq!(mem.get("StatusTurboMode").unwrap(), 1.);
        machine.handle(cmd(CmdKind::SetStatusFormat, 1, 0), T0 + 1.);
        machine.dequeue(T0 + 1.);
        assert_eq!(mem.status_format(), 1);
    }

    #[test]
    fn stop_and_restart_switch_run_mode() {
        let (mem, mut machine) = setup(150.);
        machine.handle(cmd(CmdKind::Stop, 0, 0), T0);
        machine.dequeue(T0);
        assert_eq!(mem.run_mode(), RunMode::ShutdownOk);
        machine.handle(cmd(CmdKind::Restart, 0, 0), T0 + 1.);
        machine.dequeue(T0 + 1.);
        assert_eq!(mem.run_mode(), RunMode::StartupOk);
    }
}
