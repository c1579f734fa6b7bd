//! Framing of direct-push receive URCs.
//!
//! ```text
//! +QIURC: "recv",<connectID>,<len>\r\n<len raw bytes>\r\n
//! ```
//!
//! The payload is binary and may contain CR/LF, so it is delimited by the
//! declared length only. Nothing in here touches shared state; the engine
//! does the copy once a frame is known to be complete.

use heapless::Vec;

use crate::error::{AtError, PacketStatus};
use crate::socket::SocketHandle;
use crate::tokenizer::{parse_signed_int, Tokens};

/// Capacity of the local header copy. Must be at least the largest
/// `ModuleParams::max_header_len`.
pub const PUSH_HEADER_CAPACITY: usize = 32;

/// Length of the `\r\n` closing both the header line and the payload.
const CRLF_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PushHeader {
    /// `None` when the index is not a valid socket. The frame is still
    /// delimited by its length and has to be skipped whole.
    pub socket: Option<SocketHandle>,
    /// Declared payload length.
    pub len: usize,
    /// Length of the header line, terminator excluded.
    pub header_len: usize,
}

impl PushHeader {
    /// Offset of the first payload byte.
    pub fn payload_start(&self) -> usize {
        self.header_len + CRLF_LEN
    }

    /// Bytes occupied by the whole URC, trailing `\r\n` included.
    pub fn frame_len(&self) -> usize {
        self.payload_start() + self.len + CRLF_LEN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderMatch {
    Push(PushHeader),
    /// `+QIURC: "recv",<connectID>` without a length: the buffer access mode
    /// notification, which belongs to the textual handler.
    BufferMode,
}

fn is_line_end(b: &u8) -> bool {
    *b == b'\r' || *b == b'\n'
}

/// Parse the header line at the start of `buf`.
pub fn parse_header(
    buf: &[u8],
    prefix: &[u8],
    max_header_len: usize,
) -> Result<HeaderMatch, PacketStatus> {
    if buf.len() < prefix.len() || !buf.starts_with(prefix) {
        return Err(PacketStatus::PrefixMismatch);
    }

    let header_len = match buf.iter().position(is_line_end) {
        Some(n) => n,
        // A header can never grow past the bound, waiting for more is futile
        None if buf.len() > max_header_len => return Err(PacketStatus::InvalidData),
        None => return Err(PacketStatus::SizeMismatch),
    };
    if header_len > max_header_len {
        return Err(PacketStatus::InvalidData);
    }

    let header: Vec<u8, PUSH_HEADER_CAPACITY> =
        Vec::from_slice(&buf[..header_len]).map_err(|_| PacketStatus::InvalidData)?;
    let header = core::str::from_utf8(&header).map_err(|_| AtError::Error)?;

    let mut tokens = Tokens::new(header);
    tokens.next_token()?;
    let index = tokens.next_token()?;

    let len = match tokens.next_token() {
        Ok(token) if !token.is_empty() => token,
        _ => {
            // No payload follows, so a bad index only costs this line
            SocketHandle::try_from(parse_signed_int(index, 10)?)?;
            return Ok(HeaderMatch::BufferMode);
        }
    };
    let len = usize::try_from(parse_signed_int(len, 10)?).map_err(|_| AtError::Error)?;
    if !tokens.is_exhausted() {
        return Err(PacketStatus::Failure);
    }
    let socket = parse_signed_int(index, 10)
        .and_then(SocketHandle::try_from)
        .ok();

    Ok(HeaderMatch::Push(PushHeader {
        socket,
        len,
        header_len,
    }))
}

/// Frame one complete direct-push URC at the start of `buf`, returning the
/// header and a view of its payload.
///
/// The buffer access mode variant is reported as `PrefixMismatch` so the
/// textual path can claim it. A frame whose payload or trailer has not fully
/// arrived is `SizeMismatch`.
pub fn frame<'b>(
    buf: &'b [u8],
    prefix: &[u8],
    max_header_len: usize,
) -> Result<(PushHeader, &'b [u8]), PacketStatus> {
    let header = match parse_header(buf, prefix, max_header_len)? {
        HeaderMatch::Push(header) => header,
        HeaderMatch::BufferMode => return Err(PacketStatus::PrefixMismatch),
    };

    if header.frame_len() > buf.len() {
        trace!(
            "direct push frame incomplete: {} of {} bytes",
            buf.len(),
            header.frame_len()
        );
        return Err(PacketStatus::SizeMismatch);
    }

    let start = header.payload_start();
    Ok((header, &buf[start..start + header.len]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &[u8] = b"+QIURC: \"recv\",";
    const MAX: usize = PREFIX.len() + 2 + 1 + 5;

    fn socket(i: u8) -> SocketHandle {
        SocketHandle::new(i).unwrap()
    }

    #[test]
    fn frames_payload_by_declared_length() {
        let buf = b"+QIURC: \"recv\",0,4\r\ntest\r\n";
        let (header, payload) = frame(buf, PREFIX, MAX).unwrap();

        assert_eq!(header.socket, Some(socket(0)));
        assert_eq!(header.len, 4);
        assert_eq!(header.header_len, 18);
        assert_eq!(header.frame_len(), 26);
        assert_eq!(header.frame_len(), buf.len());
        assert_eq!(payload, b"test");
    }

    #[test]
    fn payload_may_contain_line_ends() {
        let buf = b"+QIURC: \"recv\",3,6\r\na\r\nb\r\n\r\n+QIURC: \"closed\",3\r\n";
        let (header, payload) = frame(buf, PREFIX, MAX).unwrap();

        assert_eq!(payload, b"a\r\nb\r\n");
        assert_eq!(&buf[header.frame_len()..], b"+QIURC: \"closed\",3\r\n");
    }

    #[test]
    fn zero_length_payload() {
        let buf = b"+QIURC: \"recv\",1,0\r\n\r\n";
        let (header, payload) = frame(buf, PREFIX, MAX).unwrap();
        assert!(payload.is_empty());
        assert_eq!(header.frame_len(), buf.len());
    }

    #[test]
    fn short_or_foreign_buffers_are_prefix_mismatch() {
        assert_eq!(
            frame(b"+QIURC: \"re", PREFIX, MAX),
            Err(PacketStatus::PrefixMismatch)
        );
        assert_eq!(frame(b"", PREFIX, MAX), Err(PacketStatus::PrefixMismatch));
        assert_eq!(
            frame(b"+QIURC: \"closed\",1\r\n", PREFIX, MAX),
            Err(PacketStatus::PrefixMismatch)
        );
        assert_eq!(
            frame(b"+CSQ: 15,99\r\n+QIURC: \"recv\",0,4\r\n", PREFIX, MAX),
            Err(PacketStatus::PrefixMismatch)
        );
    }

    #[test]
    fn buffer_mode_notification_is_a_soft_miss() {
        assert_eq!(
            parse_header(b"+QIURC: \"recv\",2\r\n", PREFIX, MAX),
            Ok(HeaderMatch::BufferMode)
        );
        assert_eq!(
            parse_header(b"+QIURC: \"recv\",2,\r\n", PREFIX, MAX),
            Ok(HeaderMatch::BufferMode)
        );
        assert_eq!(
            frame(b"+QIURC: \"recv\",2\r\n", PREFIX, MAX),
            Err(PacketStatus::PrefixMismatch)
        );
        // Without a payload a bad index is a plain header failure
        assert_eq!(
            parse_header(b"+QIURC: \"recv\",12\r\n", PREFIX, MAX),
            Err(PacketStatus::Failure)
        );
    }

    #[test]
    fn incomplete_input_is_size_mismatch() {
        // No header terminator yet
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,4", PREFIX, MAX),
            Err(PacketStatus::SizeMismatch)
        );
        // Payload short by one byte
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,4\r\ntes", PREFIX, MAX),
            Err(PacketStatus::SizeMismatch)
        );
        // Payload complete, trailer missing
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,4\r\ntest\r", PREFIX, MAX),
            Err(PacketStatus::SizeMismatch)
        );
    }

    #[test]
    fn oversized_header_is_invalid_data() {
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,0000000004\r\ntest\r\n", PREFIX, MAX),
            Err(PacketStatus::InvalidData)
        );
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,123456789012345", PREFIX, MAX),
            Err(PacketStatus::InvalidData)
        );
    }

    #[test]
    fn bad_socket_index_still_delimits_the_frame() {
        let buf = b"+QIURC: \"recv\",12,5\r\nRDY\r\n\r\n";
        let (header, payload) = frame(buf, PREFIX, MAX).unwrap();
        assert_eq!(header.socket, None);
        assert_eq!(header.frame_len(), buf.len());
        assert_eq!(payload, b"RDY\r\n");

        let (header, payload) = frame(b"+QIURC: \"recv\",,4\r\ntest\r\n", PREFIX, MAX).unwrap();
        assert_eq!(header.socket, None);
        assert_eq!(payload, b"test");

        assert_eq!(
            frame(b"+QIURC: \"recv\",12,5\r\nRDY", PREFIX, MAX),
            Err(PacketStatus::SizeMismatch)
        );
    }

    #[test]
    fn bad_fields_are_translated_failures() {
        // Fields past the length
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,4,1\r\ntest\r\n", PREFIX, MAX),
            Err(PacketStatus::Failure)
        );
        assert_eq!(
            parse_header(b"+QIURC: \"recv\",0,4,\r\n", PREFIX, MAX),
            Err(PacketStatus::Failure)
        );
        // Negative and non-numeric lengths
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,-4\r\ntest\r\n", PREFIX, MAX),
            Err(PacketStatus::Failure)
        );
        assert_eq!(
            frame(b"+QIURC: \"recv\",0,4x\r\ntest\r\n", PREFIX, MAX),
            Err(PacketStatus::Failure)
        );
    }
}
