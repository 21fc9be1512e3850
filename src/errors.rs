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
//! Enumeration of possible simulator errors.
//!
//! The device is fire-and-forget: nothing here is ever surfaced to a network
//! peer.  Packet-level errors are logged and the offending datagram dropped.

use std::{error, fmt, io, result};


pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration file problems.
    Config,
    /// Decoded checksum does not match the computed one.
    ChecksumMismatch,
    /// Received packet is shorter than its format requires.
    ShortPacket,
    /// Header, footer or size field of a packet is malformed.
    Framing,
    /// Command ID is not in the command table.
    UnknownCommand,
    /// Command arguments are outside their legal range.
    RangeViolation,
    /// Command is not applicable in the current phase.
    InvalidState,
    /// Parameter name is not in the registry.
    UnknownParameter,
    /// Phase enumerant or ordinal is not valid.
    InvalidPhase,
    /// send/recv syscall failure.
    SocketError,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    // Quick construction.

    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn checksum(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::ChecksumMismatch, message: msg.into() }
    }

    pub fn short_packet(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::ShortPacket, message: msg.into() }
    }

    pub fn framing(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Framing, message: msg.into() }
    }

    pub fn unknown_command(code: u16) -> Self {
        Self { kind: ErrorKind::UnknownCommand, message: format!("command id {}", code) }
    }

    pub fn range(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::RangeViolation, message: msg.into() }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::InvalidState, message: msg.into() }
    }

    pub fn unknown_param(name: &str) -> Self {
        Self { kind: ErrorKind::UnknownParameter, message: name.into() }
    }

    pub fn invalid_phase(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::InvalidPhase, message: msg.into() }
    }
}

/// Allow quick conversion of io::Error for the socket loops.
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self { kind: ErrorKind::SocketError, message: e.to_string() }
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Config => "Config",
            ErrorKind::ChecksumMismatch => "ChecksumMismatch",
            ErrorKind::ShortPacket => "ShortPacket",
            ErrorKind::Framing => "Framing",
            ErrorKind::UnknownCommand => "UnknownCommand",
            ErrorKind::RangeViolation => "RangeViolation",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::UnknownParameter => "UnknownParameter",
            ErrorKind::InvalidPhase => "InvalidPhase",
            ErrorKind::SocketError => "SocketError",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}
