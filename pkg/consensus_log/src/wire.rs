//! Wire codec (spec §4.G): decodes the fixed SBE-style `MessageHeader` and
//! the two control templates. All multi-byte fields are little-endian, SBE's
//! default byte order. This module only decodes — the crate is a consumer of
//! the control stream, never a producer.
//!
//! Grounded on the general "fixed header, then fixed fields, then a variable
//! trailer" shape of `pkg/net/src/dns/message.rs`, adapted to plain
//! `from_le_bytes` reads since SBE fields here are fixed-width integers, not
//! the DNS code's length-prefixed names and labels.

use crate::errors::*;

/// Length in bytes of the fixed SBE `MessageHeader` that prefixes every
/// control message.
pub const MESSAGE_HEADER_LEN: usize = 8;

pub const TEMPLATE_ID_HEARTBEAT: u16 = 1;
pub const TEMPLATE_ID_RESEND: u16 = 2;

const HEARTBEAT_BODY_LEN: usize = 4 + 4 + 8 + 8 + 8;
const RESEND_FIXED_LEN: usize = 4 + 4 + 8 + 8;
const VAR_DATA_LEN_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub block_length: u16,
    pub template_id: u16,
    pub schema_id: u16,
    pub version: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub leadership_term: i32,
    pub leader_session_id: i32,
    pub position: i64,
    pub stream_start_position: i64,
    pub stream_position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resend<'a> {
    pub leader_session_id: i32,
    pub leadership_term: i32,
    pub start_position: i64,
    pub stream_start_position: i64,
    pub body: &'a [u8],
}

/// A decoded control message, or an unrecognized template id (skipped by the
/// dispatcher rather than treated as an error, so that future template
/// additions don't break old readers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrame<'a> {
    Heartbeat(Heartbeat),
    Resend(Resend<'a>),
    Unknown { template_id: u16 },
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

fn read_i64(buf: &[u8], offset: usize) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    i64::from_le_bytes(bytes)
}

pub fn decode_message_header(buf: &[u8]) -> Result<MessageHeader> {
    if buf.len() < MESSAGE_HEADER_LEN {
        return Err(err_msg("control message shorter than MessageHeader"));
    }
    Ok(MessageHeader {
        block_length: read_u16(buf, 0),
        template_id: read_u16(buf, 2),
        schema_id: read_u16(buf, 4),
        version: read_u16(buf, 6),
    })
}

pub fn decode_heartbeat(body: &[u8]) -> Result<Heartbeat> {
    if body.len() < HEARTBEAT_BODY_LEN {
        return Err(err_msg("heartbeat body shorter than its fixed block"));
    }
    Ok(Heartbeat {
        leadership_term: read_i32(body, 0),
        leader_session_id: read_i32(body, 4),
        position: read_i64(body, 8),
        stream_start_position: read_i64(body, 16),
        stream_position: read_i64(body, 24),
    })
}

pub fn decode_resend(body: &[u8]) -> Result<Resend> {
    if body.len() < RESEND_FIXED_LEN + VAR_DATA_LEN_PREFIX {
        return Err(err_msg("resend body shorter than its fixed block"));
    }

    let leader_session_id = read_i32(body, 0);
    let leadership_term = read_i32(body, 4);
    let start_position = read_i64(body, 8);
    let stream_start_position = read_i64(body, 16);

    let var_data_len = {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&body[RESEND_FIXED_LEN..RESEND_FIXED_LEN + 4]);
        u32::from_le_bytes(bytes) as usize
    };

    let var_data_start = RESEND_FIXED_LEN + VAR_DATA_LEN_PREFIX;
    let var_data_end = var_data_start
        .checked_add(var_data_len)
        .ok_or_else(|| err_msg("resend varData length overflows"))?;
    if body.len() < var_data_end {
        return Err(err_msg("resend body shorter than its declared varData length"));
    }

    Ok(Resend {
        leader_session_id,
        leadership_term,
        start_position,
        stream_start_position,
        body: &body[var_data_start..var_data_end],
    })
}

pub fn decode_control_frame(buf: &[u8]) -> Result<ControlFrame> {
    let header = decode_message_header(buf)?;
    let body = &buf[MESSAGE_HEADER_LEN..];
    match header.template_id {
        TEMPLATE_ID_HEARTBEAT => Ok(ControlFrame::Heartbeat(decode_heartbeat(body)?)),
        TEMPLATE_ID_RESEND => Ok(ControlFrame::Resend(decode_resend(body)?)),
        other => Ok(ControlFrame::Unknown { template_id: other }),
    }
}

/// Peeks the template id of a data-transport fragment without fully decoding
/// it, so the Message Filter (§4.C rule 4) can recognize a consensus
/// heartbeat that leaked onto the data stream.
pub fn peek_template_id(buf: &[u8]) -> Option<u16> {
    if buf.len() < MESSAGE_HEADER_LEN {
        return None;
    }
    Some(read_u16(buf, 2))
}

/// Extracts the cluster-stream tag from a fragment header's 64-bit reserved
/// value. The tag occupies the whole reserved value in this crate's wire
/// convention (no other bits are multiplexed into it).
pub fn extract_cluster_stream_id(reserved_value: i64) -> i64 {
    reserved_value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat_frame(term: i32, leader_session_id: i32, p: i64, s_start: i64, s_end: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(HEARTBEAT_BODY_LEN as u16).to_le_bytes());
        buf.extend_from_slice(&TEMPLATE_ID_HEARTBEAT.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&term.to_le_bytes());
        buf.extend_from_slice(&leader_session_id.to_le_bytes());
        buf.extend_from_slice(&p.to_le_bytes());
        buf.extend_from_slice(&s_start.to_le_bytes());
        buf.extend_from_slice(&s_end.to_le_bytes());
        buf
    }

    #[test]
    fn decodes_heartbeat_frame() {
        let buf = heartbeat_frame(1, 42, 100, 0, 100);
        match decode_control_frame(&buf).unwrap() {
            ControlFrame::Heartbeat(hb) => {
                assert_eq!(hb.leadership_term, 1);
                assert_eq!(hb.leader_session_id, 42);
                assert_eq!(hb.position, 100);
                assert_eq!(hb.stream_start_position, 0);
                assert_eq!(hb.stream_position, 100);
            }
            other => panic!("expected heartbeat, got {:?}", other),
        }
    }

    #[test]
    fn decodes_resend_frame_with_var_data() {
        let body_bytes = b"hello world!";
        let mut buf = Vec::new();
        buf.extend_from_slice(&((RESEND_FIXED_LEN + VAR_DATA_LEN_PREFIX + body_bytes.len()) as u16).to_le_bytes());
        buf.extend_from_slice(&TEMPLATE_ID_RESEND.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&7i32.to_le_bytes());
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&100i64.to_le_bytes());
        buf.extend_from_slice(&0i64.to_le_bytes());
        buf.extend_from_slice(&(body_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(body_bytes);

        match decode_control_frame(&buf).unwrap() {
            ControlFrame::Resend(resend) => {
                assert_eq!(resend.leader_session_id, 7);
                assert_eq!(resend.leadership_term, 2);
                assert_eq!(resend.start_position, 100);
                assert_eq!(resend.body, body_bytes);
            }
            other => panic!("expected resend, got {:?}", other),
        }
    }

    #[test]
    fn unknown_template_id_is_not_an_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&99u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());

        match decode_control_frame(&buf).unwrap() {
            ControlFrame::Unknown { template_id } => assert_eq!(template_id, 99),
            other => panic!("expected unknown, got {:?}", other),
        }
    }

    #[test]
    fn truncated_header_is_an_error() {
        assert!(decode_message_header(&[0u8; 4]).is_err());
    }

    #[test]
    fn peek_template_id_reads_without_full_decode() {
        let buf = heartbeat_frame(1, 42, 100, 0, 100);
        assert_eq!(peek_template_id(&buf), Some(TEMPLATE_ID_HEARTBEAT));
        assert_eq!(peek_template_id(&[0u8; 2]), None);
    }
}
