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
//! Send a command to a specific (by IP) CS800 controller.
//!
//! The controller will not reply; watch the status broadcasts for the
//! effect.

use std::net::{IpAddr, SocketAddr};
use log::*;
use clap::{clap_app, crate_version};

use cs800sim::client::Commander;
use cs800sim::errors::Result;
use cs800sim::proto::COMMAND_PORT;


fn run(commander: &Commander, command: &str, arg1: Option<f64>, arg2: Option<f64>)
       -> Result<Option<()>> {
    let arg = arg1.unwrap_or(0.);
    Ok(Some(match command {
        "restart" => commander.restart()?,
        "ramp" => match arg2 {
            Some(setpoint) => commander.ramp(arg, setpoint)?,
            None => return Ok(None),
        },
        "plat" => commander.plat(arg)?,
        "hold" => commander.hold()?,
        "cool" => commander.cool(arg)?,
        "end" => commander.end(arg)?,
        "purge" => commander.purge()?,
        "pause" => commander.pause()?,
        "resume" => commander.resume()?,
        "stop" => commander.stop()?,
        "turbo" => commander.turbo(arg == 1.)?,
        "format" => commander.set_status_format(arg as u16)?,
        _ => return Ok(None),
    }))
}

fn main() {
    let args = clap_app!(("cs800-commander") =>
        (version: crate_version!())
        (author: "Georg Brandl")
        (about: "Send a command to a CS800 controller.")
        (@arg verbose: -v "Debug logging output?")
        (@arg port: --port [PORT] "Command port of the controller")
        (@arg host: +required "Controller IP address")
        (@arg command: +required "One of restart, ramp, plat, hold, cool, \
                                  end, purge, pause, resume, stop, turbo, format")
        (@arg arg1: [ARG1] "Rate (K/h), setpoint (K), duration (min) or flag")
        (@arg arg2: [ARG2] "Setpoint (K) for ramp")
    ).get_matches();

    if let Err(err) = mlzlog::init(None::<&str>, "commander", mlzlog::Settings {
        show_appname: false,
        debug: args.is_present("verbose"),
        use_stdout: true,
        ..Default::default()
    }) {
        eprintln!("could not initialize logging: {}", err);
    }

    let host: IpAddr = match args.value_of("host").expect("is required").parse() {
        Ok(host) => host,
        Err(err) => {
            error!("invalid controller address: {}", err);
            return;
        }
    };
    let port = args.value_of("port")
                   .map_or(COMMAND_PORT, |p| p.parse().expect("numeric port"));
    let parse_arg = |name| args.value_of(name)
                               .map(|v: &str| v.parse().expect("numeric argument"));

    let commander = Commander::new(SocketAddr::new(host, port))
        .expect("could not create sending socket");
    let command = args.value_of("command").expect("is required");
    match run(&commander, command, parse_arg("arg1"), parse_arg("arg2")) {
        Ok(Some(())) => info!("{} sent to {}", command, host),
        Ok(None) => error!("unknown command or missing argument: {}", command),
        Err(err) => error!("could not send: {}", err),
    }
}
