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
//! The main entry point for the simulator executable.

use log::*;
use clap::{clap_app, crate_version};
use mlzutil::fs as fsutil;

use cs800sim::config::{load_config, SimConfig};
use cs800sim::server::Simulator;


fn main() {
    let args = clap_app!(("cs800sim") =>
        (version: crate_version!())
        (author: "Georg Brandl")
        (about: "A simulator for the CS800 cryostream controller.")
        (@setting DeriveDisplayOrder)
        (@arg verbose: -v "Debug logging output?")
        (@arg log: --log [LOGPATH] default_value("log") "Logging path")
        (@arg pid: --pid [PIDPATH] default_value("pid") "PID path")
        (@arg daemon: -d "Daemonize?")
        (@arg user: --user [USER] "User name for daemon")
        (@arg group: --group [GROUP] "Group name for daemon")
        (@arg config: [CONFIG] "Configuration file name to load")
    ).get_matches();

    let log_path = fsutil::abspath(args.value_of("log").expect(""));
    let pid_path = fsutil::abspath(args.value_of("pid").expect(""));
    if args.is_present("daemon") {
        let mut daemon = daemonize::Daemonize::new();
        if let Some(user) = args.value_of("user") {
            daemon = daemon.user(user);
        }
        if let Some(group) = args.value_of("group") {
            daemon = daemon.group(group);
        }
        if let Err(err) = daemon.start() {
            eprintln!("could not daemonize process: {}", err);
        }
    }

    // handle SIGINT and SIGTERM
    let mut signals = signal_hook::iterator::Signals::new(
        [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM])
        .expect("signal register failed");

    if let Err(err) = mlzlog::init(Some(log_path), "cs800sim", mlzlog::Settings {
        show_appname: false,
        debug: args.is_present("verbose"),
        use_stdout: !args.is_present("daemon"),
        ..Default::default()
    }) {
        eprintln!("could not initialize logging: {}", err);
    }
    if let Err(err) = fsutil::write_pidfile(&pid_path, "cs800sim") {
        error!("could not write PID file: {}", err);
    }

    let cfg = match args.value_of("config") {
        None => SimConfig::default(),
        Some(name) => match load_config(name) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!("could not parse config file {}: {}", name, err);
                return;
            }
        }
    };

    info!("starting simulated controller...");
    match Simulator::new(cfg).start() {
        Err(err) => error!("could not start the simulator: {}", err),
        Ok(handle) => {
            // workers are running; wait for a signal to finish
            signals.forever().next();
            info!("quitting...");
            handle.stop();
        }
    }

    fsutil::remove_pidfile(pid_path, "cs800sim");
}
