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
//! This module contains the wire formats of the three UDP interfaces, along
//! with the encoding primitives they share.
//!
//! There is no request/response anywhere: status and identity packets are
//! broadcast, command packets are fire-and-forget.

use std::net::{IpAddr, Ipv4Addr};

use crate::errors::{Error, Result};
use crate::util;

/// Identity broadcasts (from controller).
pub const IDENTITY_PORT: u16 = 30303;
/// Status broadcasts (from controller).
pub const STATUS_PORT: u16 = 30304;
/// Command reception (to controller).
pub const COMMAND_PORT: u16 = 30305;

pub const STATUS_HEADER: [u8; 2] = [0xAA, 0xAB];
pub const STATUS_FOOTER: [u8; 2] = [0xAB, 0xAA];

/// Offset of the 16-bit checksum in a status frame: directly after the
/// `{ID,VALUE}` region, before the footer.
pub fn checksum_offset(data_size: usize) -> usize {
    4 + data_size
}

/// Pack an integer big-endian, without leading zero bytes.
pub fn pack_be(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    while value > 0 {
        out.push((value % 256) as u8);
        value /= 256;
    }
    out.reverse();
    out
}

/// Unpack a big-endian integer of any length.
pub fn unpack_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| acc * 256 + u64::from(b))
}

/// Pack into exactly two bytes, zero-padded.
pub fn pack2(value: u16) -> [u8; 2] {
    let bytes = pack_be(value.into());
    let mut out = [0; 2];
    out[2 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Byte-wise sum of `data` modulo `basis` (256 for command packets,
/// 65536 for status frames).
pub fn checksum(data: &[u8], basis: u64) -> u64 {
    data.iter().map(|&b| u64::from(b)).sum::<u64>() % basis
}


/// Encode a status frame from quantised `(id, value)` pairs in canonical
/// order:
///
/// ```text
/// HEADER(2) | DATA_SIZE(2) | { ID(2) VALUE(2) }*N | CKSUM(2) | FOOTER(2)
/// ```
pub fn encode_status(params: &[(u16, u16)]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 4 * params.len());
    buf.extend_from_slice(&STATUS_HEADER);
    buf.extend_from_slice(&pack2((4 * params.len()) as u16));
    for &(id, value) in params {
        buf.extend_from_slice(&pack2(id));
        buf.extend_from_slice(&pack2(value));
    }
    let cksum = checksum(&buf[4..], 65536) as u16;
    buf.extend_from_slice(&pack2(cksum));
    buf.extend_from_slice(&STATUS_FOOTER);
    buf
}

/// Decode and verify a status frame into its `(id, value)` pairs.
pub fn decode_status(buf: &[u8]) -> Result<Vec<(u16, u16)>> {
    if buf.len() < 8 {
        return Err(Error::short_packet(format!("status frame of {} bytes", buf.len())));
    }
    if buf[..2] != STATUS_HEADER {
        return Err(Error::framing("bad header"));
    }
    let data_size = unpack_be(&buf[2..4]) as usize;
    if data_size % 4 != 0 {
        return Err(Error::framing(format!("data size {} not a multiple of 4", data_size)));
    }
    if buf.len() != 8 + data_size {
        return Err(Error::short_packet(
            format!("expected {} bytes, got {}", 8 + data_size, buf.len())));
    }
    let cksum_at = checksum_offset(data_size);
    if buf[cksum_at + 2..] != STATUS_FOOTER {
        return Err(Error::framing("bad footer"));
    }
    let body = &buf[4..cksum_at];
    let reported = unpack_be(&buf[cksum_at..cksum_at + 2]);
    let computed = checksum(body, 65536);
    if reported != computed {
        return Err(Error::checksum(format!("reported {}, computed {}", reported, computed)));
    }
    Ok(body.chunks(4)
           .map(|entry| (unpack_be(&entry[..2]) as u16, unpack_be(&entry[2..]) as u16))
           .collect())
}


/// A decoded identity announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub mac: [u8; 6],
}

/// Encode the 22-byte binary identity form: 16 bytes of space-padded
/// NetBIOS name followed by the MAC address in big-endian binary.
pub fn encode_identity(name: &str, mac: [u8; 6]) -> Vec<u8> {
    let mut buf = format!("{:16}", name).into_bytes();
    buf.truncate(16);
    buf.extend_from_slice(&mac);
    buf
}

/// Decode an identity announcement.  Real hardware has been observed to emit
/// a text form besides the binary one; both must be accepted.
pub fn decode_identity(buf: &[u8]) -> Result<Identity> {
    if buf.len() == 22 {
        let name = String::from_utf8_lossy(&buf[..16]).trim().to_owned();
        let mut mac = [0; 6];
        mac.copy_from_slice(&buf[16..22]);
        Ok(Identity { name, mac })
    } else if buf.len() >= 34 && &buf[15..17] == b"\r\n" {
        // 15 name bytes (or all 0xFF), CR LF, then "AA-BB-CC-DD-EE-FF"
        let text = std::str::from_utf8(&buf[17..34])
            .map_err(|_| Error::framing("identity MAC text not ASCII"))?;
        let mac = util::parse_mac(text)
            .ok_or_else(|| Error::framing(format!("bad identity MAC text {:?}", text)))?;
        let name = String::from_utf8_lossy(&buf[..15])
            .trim_matches(|c: char| c == '\u{fffd}' || c == ' ' || c == '\u{ff}')
            .to_owned();
        Ok(Identity { name, mac })
    } else {
        Err(Error::short_packet(format!("identity packet of {} bytes", buf.len())))
    }
}


/// The command table.  Wire codes are fixed by the hardware protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdKind {
    /// Re-initialise a shut-down Cryostream back to Ready.
    Restart,
    /// Change gas temperature to a set value at a controlled rate.
    Ramp,
    /// Maintain the current temperature for a set time.
    Plat,
    /// Enter programmed Hold (no resume).
    Hold,
    /// Decrease gas temperature as quickly as possible.
    Cool,
    /// Ramp to 300 K, then shut down.
    End,
    /// Warm internals to 300 K, then shut down.
    Purge,
    /// Enter temporary Hold.
    Pause,
    /// Exit temporary Hold.
    Resume,
    /// Shut down.
    Stop,
    /// Turbo mode off/on.
    Turbo,
    /// Choose the status packet variant.
    SetStatusFormat,
}

impl CmdKind {
    pub fn code(self) -> u16 {
        match self {
            CmdKind::Restart => 10,
            CmdKind::Ramp => 11,
            CmdKind::Plat => 12,
            CmdKind::Hold => 13,
            CmdKind::Cool => 14,
            CmdKind::End => 15,
            CmdKind::Purge => 16,
            CmdKind::Pause => 17,
            CmdKind::Resume => 18,
            CmdKind::Stop => 19,
            CmdKind::Turbo => 20,
            CmdKind::SetStatusFormat => 40,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            10 => CmdKind::Restart,
            11 => CmdKind::Ramp,
            12 => CmdKind::Plat,
            13 => CmdKind::Hold,
            14 => CmdKind::Cool,
            15 => CmdKind::End,
            16 => CmdKind::Purge,
            17 => CmdKind::Pause,
            18 => CmdKind::Resume,
            19 => CmdKind::Stop,
            20 => CmdKind::Turbo,
            40 => CmdKind::SetStatusFormat,
            _ => return None,
        })
    }
}

/// A decoded operator command.
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CmdKind,
    pub arg1: u16,
    pub arg2: u16,
    /// Local receive timestamp, seconds since the epoch.
    pub received: f64,
    pub source: IpAddr,
}

impl Command {
    /// An internally generated command (End's shutdown sequence).
    pub fn internal(kind: CmdKind, arg1: u16, now: f64) -> Self {
        Command { kind, arg1, arg2: 0, received: now,
                  source: IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
    }
}

/// Encode a 7-byte command packet:
///
/// ```text
/// CMD_ID(2) | ARG1(2) | ARG2(2) | CKSUM(1) = sum of first 6 bytes mod 256
/// ```
pub fn encode_command(kind: CmdKind, arg1: u16, arg2: u16) -> [u8; 7] {
    let mut buf = [0; 7];
    buf[0..2].copy_from_slice(&pack2(kind.code()));
    buf[2..4].copy_from_slice(&pack2(arg1));
    buf[4..6].copy_from_slice(&pack2(arg2));
    buf[6] = checksum(&buf[..6], 256) as u8;
    buf
}

/// Decode and verify a command packet.
pub fn decode_command(buf: &[u8], received: f64, source: IpAddr) -> Result<Command> {
    if buf.len() != 7 {
        return Err(Error::short_packet(format!("command packet of {} bytes", buf.len())));
    }
    let computed = checksum(&buf[..6], 256) as u8;
    if buf[6] != computed {
        return Err(Error::checksum(format!("reported {}, computed {}", buf[6], computed)));
    }
    let code = unpack_be(&buf[0..2]) as u16;
    let kind = CmdKind::from_code(code).ok_or_else(|| Error::unknown_command(code))?;
    Ok(Command { kind,
                 arg1: unpack_be(&buf[2..4]) as u16,
                 arg2: unpack_be(&buf[4..6]) as u16,
                 received, source })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn be_primitives() {
        assert_eq!(pack_be(0), b"");
        assert_eq!(pack_be(0x1234), b"\x12\x34");
        assert_eq!(unpack_be(&pack_be(987654)), 987654);
        assert_eq!(pack2(7), [0, 7]);
        assert_eq!(pack2(0xAABB), [0xAA, 0xBB]);
        assert_eq!(checksum(b"\xff\xff\x02", 256), 0);
        assert_eq!(checksum(b"\xff\xff\x02", 65536), 512);
    }

    #[test]
    fn status_roundtrip() {
        let params = vec![(1, 10000), (2, 10012), (4, 3), (5, 0), (6, 360)];
        let frame = encode_status(&params);
        assert_eq!(frame[..2], STATUS_HEADER);
        assert_eq!(frame[frame.len() - 2..], STATUS_FOOTER);
        assert_eq!(unpack_be(&frame[2..4]), 4 * params.len() as u64);
        assert_eq!(decode_status(&frame).unwrap(), params);
    }

    #[test]
    fn status_checksum_is_before_footer() {
        let frame = encode_status(&[(7, 20000)]);
        // one parameter: data size 4, checksum at offset 8
        assert_eq!(checksum_offset(4), 8);
        assert_eq!(unpack_be(&frame[8..10]), checksum(&frame[4..8], 65536));
    }

    #[test]
    fn status_rejects_any_flipped_body_byte() {
        let frame = encode_status(&[(1, 10000), (2, 10012), (6, 360)]);
        let data_size = unpack_be(&frame[2..4]) as usize;
        for at in 4..4 + data_size {
            let mut bad = frame.clone();
            bad[at] ^= 0x01;
            assert!(matches!(decode_status(&bad).unwrap_err().kind(),
                             ErrorKind::ChecksumMismatch),
                    "flip at offset {} not caught", at);
        }
    }

    #[test]
    fn status_rejects_malformed_frames() {
        let frame = encode_status(&[(1, 10000)]);
        assert_eq!(*decode_status(&frame[..5]).unwrap_err().kind(), ErrorKind::ShortPacket);
        let mut bad = frame.clone();
        bad[0] = 0xAB;
        assert_eq!(*decode_status(&bad).unwrap_err().kind(), ErrorKind::Framing);
        let mut bad = frame.clone();
        bad[3] = 6;
        assert_eq!(*decode_status(&bad).unwrap_err().kind(), ErrorKind::Framing);
        let mut bad = frame;
        let at = bad.len() - 1;
        bad[at] = 0;
        assert_eq!(*decode_status(&bad).unwrap_err().kind(), ErrorKind::Framing);
    }

    #[test]
    fn command_roundtrip() {
        let now = 1234567890.;
        let source = IpAddr::V4(Ipv4Addr::LOCALHOST);
        for (kind, arg1, arg2) in [(CmdKind::Restart, 0, 0),
                                   (CmdKind::Ramp, 60, 20000),
                                   (CmdKind::Plat, 1440, 0),
                                   (CmdKind::Cool, 8000, 0),
                                   (CmdKind::End, 360, 0),
                                   (CmdKind::Turbo, 1, 0),
                                   (CmdKind::SetStatusFormat, 1, 0)] {
            let buf = encode_command(kind, arg1, arg2);
            assert_eq!(buf[6], buf[..6].iter().map(|&b| b as u32).sum::<u32>() as u8);
            let cmd = decode_command(&buf, now, source).unwrap();
            assert_eq!((cmd.kind, cmd.arg1, cmd.arg2), (kind, arg1, arg2));
        }
    }

    #[test]
    fn command_rejects_corruption() {
        let mut buf = encode_command(CmdKind::Ramp, 60, 20000);
        buf[3] ^= 0x40;
        assert_eq!(*decode_command(&buf, 0., IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap_err().kind(),
                   ErrorKind::ChecksumMismatch);
        let buf = encode_command(CmdKind::Ramp, 60, 20000);
        assert_eq!(*decode_command(&buf[..6], 0., IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap_err().kind(),
                   ErrorKind::ShortPacket);
        // unknown command id, checksum intact
        let mut buf = [0; 7];
        buf[1] = 99;
        buf[6] = 99;
        assert_eq!(*decode_command(&buf, 0., IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap_err().kind(),
                   ErrorKind::UnknownCommand);
    }

    #[test]
    fn identity_binary_roundtrip() {
        let mac = [0x00, 0x1B, 0x44, 0x11, 0x3A, 0xB7];
        let buf = encode_identity("cryo1", mac);
        assert_eq!(buf.len(), 22);
        assert_eq!(&buf[..5], b"cryo1");
        assert_eq!(buf[5..16], *b"           ");
        let id = decode_identity(&buf).unwrap();
        assert_eq!(id, Identity { name: "cryo1".into(), mac });
    }

    #[test]
    fn identity_name_is_truncated() {
        let buf = encode_identity("a-very-long-netbios-name", [0; 6]);
        assert_eq!(buf.len(), 22);
        assert_eq!(decode_identity(&buf).unwrap().name, "a-very-long-netb");
    }

    #[test]
    fn identity_text_form() {
        let mut buf = vec![0xFF; 15];
        buf.extend_from_slice(b"\r\n00-1B-44-11-3A-B7");
        let id = decode_identity(&buf).unwrap();
        assert_eq!(id.mac, [0x00, 0x1B, 0x44, 0x11, 0x3A, 0xB7]);
        assert_eq!(*decode_identity(&buf[..20]).unwrap_err().kind(), ErrorKind::ShortPacket);
    }
}
