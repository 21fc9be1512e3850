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
//! Discover CS800 controllers by their identity broadcasts.

use log::*;
use clap::{clap_app, crate_version};
use mlzutil::time::localtime;

use cs800sim::client::Discoverer;
use cs800sim::proto::IDENTITY_PORT;
use cs800sim::util::format_mac;


fn main() {
    let args = clap_app!(("cs800-discover") =>
        (version: crate_version!())
        (author: "Georg Brandl")
        (about: "Discover CS800 controllers on the LAN.")
        (@arg verbose: -v "Debug logging output?")
        (@arg port: --port [PORT] "Port to listen on")
    ).get_matches();

    if let Err(err) = mlzlog::init(None::<&str>, "discover", mlzlog::Settings {
        show_appname: false,
        debug: args.is_present("verbose"),
        use_stdout: true,
        ..Default::default()
    }) {
        eprintln!("could not initialize logging: {}", err);
    }

    let port = args.value_of("port")
                   .map_or(IDENTITY_PORT, |p| p.parse().expect("numeric port"));
    let discoverer = match Discoverer::bind(port) {
        Ok(discoverer) => discoverer,
        Err(err) => {
            error!("could not listen on port {}: {}", port, err);
            return;
        }
    };
    info!("listening for controller IDs on port {}", port);

    loop {
        match discoverer.next() {
            Ok((addr, identity)) => {
                println!("({:.3}, {}) {} {}", localtime(), addr,
                         identity.name, format_mac(identity.mac));
            }
            Err(err) => debug!("unusable announcement: {}", err),
        }
    }
}
