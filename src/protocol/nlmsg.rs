//! Netlink message framing for Validator datagrams.
//!
//! Each datagram carries one `nlmsghdr` followed by the report text as a C
//! string. Only the header layout matters here; the message type and flags
//! are not interpreted.

#![allow(missing_docs)]

use memchr::memchr;

/// `NLMSG_ALIGNTO`.
pub const NLMSG_ALIGNTO: usize = 4;
/// `NLMSG_HDRLEN`: aligned size of `struct nlmsghdr`.
pub const NLMSG_HDRLEN: usize = nlmsg_align(16);

#[must_use]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// `NLMSG_SPACE`: buffer needed for a message carrying `payload` bytes.
#[must_use]
pub const fn nlmsg_space(payload: usize) -> usize {
    nlmsg_align(NLMSG_HDRLEN + payload)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NlMsgHeader {
    pub len: u32,
    pub kind: u16,
    pub flags: u16,
    pub seq: u32,
    pub pid: u32,
}

impl NlMsgHeader {
    /// Decode the header at the start of `datagram`, native endian.
    #[must_use]
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        let raw = datagram.get(..16)?;
        let u32_at = |at: usize| u32::from_ne_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);
        let u16_at = |at: usize| u16::from_ne_bytes([raw[at], raw[at + 1]]);
        Some(Self {
            len: u32_at(0),
            kind: u16_at(4),
            flags: u16_at(6),
            seq: u32_at(8),
            pid: u32_at(12),
        })
    }

    #[must_use]
    pub fn encode(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.len.to_ne_bytes());
        out[4..6].copy_from_slice(&self.kind.to_ne_bytes());
        out[6..8].copy_from_slice(&self.flags.to_ne_bytes());
        out[8..12].copy_from_slice(&self.seq.to_ne_bytes());
        out[12..16].copy_from_slice(&self.pid.to_ne_bytes());
        out
    }
}

/// Report bytes of a received datagram (`NLMSG_DATA`).
///
/// Bounded by the received length and by `nlmsg_len` when it is plausible,
/// and cut at the first NUL. A datagram too short to hold a header yields an
/// empty payload.
#[must_use]
pub fn payload(datagram: &[u8]) -> &[u8] {
    let Some(header) = NlMsgHeader::decode(datagram) else {
        return &[];
    };
    let declared = usize::try_from(header.len).unwrap_or(usize::MAX);
    let end = if (NLMSG_HDRLEN..=datagram.len()).contains(&declared) {
        declared
    } else {
        datagram.len()
    };
    let body = datagram.get(NLMSG_HDRLEN..end).unwrap_or(&[]);
    memchr(0, body).map_or(body, |nul| &body[..nul])
}

/// Frame `report` the way the kernel side does: header, text, NUL, padding.
#[must_use]
pub fn encode(report: &[u8], seq: u32, pid: u32) -> Vec<u8> {
    let len = NLMSG_HDRLEN + report.len() + 1;
    let header = NlMsgHeader {
        len: u32::try_from(len).unwrap_or(u32::MAX),
        kind: 0,
        flags: 0,
        seq,
        pid,
    };
    let mut out = Vec::with_capacity(nlmsg_align(len));
    out.extend_from_slice(&header.encode());
    out.resize(NLMSG_HDRLEN, 0);
    out.extend_from_slice(report);
    out.push(0);
    out.resize(nlmsg_align(len), 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_matches_kernel_macros() {
        assert_eq!(NLMSG_HDRLEN, 16);
        assert_eq!(nlmsg_space(4096), 4112);
        assert_eq!(nlmsg_space(1), 20);
    }

    #[test]
    fn payload_stops_at_nul() {
        let framed = encode(b"Process: A\n", 7, 0);
        assert_eq!(framed.len() % NLMSG_ALIGNTO, 0);
        assert_eq!(payload(&framed), b"Process: A\n");
        let header = NlMsgHeader::decode(&framed).expect("header");
        assert_eq!(header.seq, 7);
        assert_eq!(header.len as usize, NLMSG_HDRLEN + 12);
    }

    #[test]
    fn short_datagram_has_empty_payload() {
        assert!(payload(&[1, 2, 3]).is_empty());
        assert!(payload(&[]).is_empty());
    }

    #[test]
    fn bogus_declared_length_falls_back_to_received_length() {
        let mut framed = encode(b"File: /x", 0, 0);
        framed[0..4].copy_from_slice(&u32::MAX.to_ne_bytes());
        assert_eq!(payload(&framed), b"File: /x");
    }

    #[test]
    fn declared_length_truncates_trailing_bytes() {
        let mut framed = NlMsgHeader {
            len: 20,
            ..NlMsgHeader::default()
        }
        .encode()
        .to_vec();
        framed.extend_from_slice(b"abcdefgh");
        assert_eq!(payload(&framed), b"abcd");
    }
}
