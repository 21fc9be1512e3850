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
//! Listen for CS800 status broadcasts and print them.

use log::*;
use clap::{clap_app, crate_version};

use cs800sim::client::{StatusListener, StatusReport};
use cs800sim::proto::STATUS_PORT;


fn print_terse(report: &StatusReport) {
    // the controller number is absent from reduced-format frames
    println!("({:.3}, {}) #{} {} / {}  SP {:.2} K  T {:.2} K",
             report.received,
             report.source,
             report.value("SetUpControllerNumber").map_or("?".into(), |v| v.to_string()),
             report.run_mode().map_or("?".into(), |m| m.to_string()),
             report.phase().map_or("?".into(), |p| p.to_string()),
             report.value("StatusGasSetPoint").unwrap_or(0.),
             report.value("StatusGasTemp").unwrap_or(0.));
}

fn print_full(report: &StatusReport) {
    println!("({:.3}, {})", report.received, report.source);
    for (name, value) in &report.values {
        println!("    {:24} {:10.2}", name, value);
    }
}

fn main() {
    let args = clap_app!(("cs800-listener") =>
        (version: crate_version!())
        (author: "Georg Brandl")
        (about: "Listen for CS800 status broadcasts.")
        (@arg verbose: -v "Debug logging output?")
        (@arg port: --port [PORT] "Port to listen on")
        (@arg full: --full "Print all parameters instead of a summary line")
    ).get_matches();

    if let Err(err) = mlzlog::init(None::<&str>, "listener", mlzlog::Settings {
        show_appname: false,
        debug: args.is_present("verbose"),
        use_stdout: true,
        ..Default::default()
    }) {
        eprintln!("could not initialize logging: {}", err);
    }

    let port = args.value_of("port")
                   .map_or(STATUS_PORT, |p| p.parse().expect("numeric port"));
    let listener = match StatusListener::bind(port) {
        Ok(listener) => listener,
        Err(err) => {
            error!("could not listen on port {}: {}", port, err);
            return;
        }
    };
    info!("listening for status updates on port {}", port);

    loop {
        match listener.next() {
            Ok(report) => if args.is_present("full") {
                print_full(&report);
            } else {
                print_terse(&report);
            },
            // out-of-spec packets are dropped
            Err(err) => debug!("unusable frame: {}", err),
        }
    }
}
