//! Framing on the serial link: 4 bytes BE sequence + 32-byte digest + payload, no delimiter.

use crate::frame::{effective_chunk_size, Frame};
use crate::integrity::DIGEST_LEN;

const SEQ_SIZE: usize = 4;

/// Fixed bytes preceding every payload.
pub const FRAME_HEADER_LEN: usize = SEQ_SIZE + DIGEST_LEN;

/// Encode a frame: sequence (big-endian), checksum, payload.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + frame.payload().len());
    out.extend_from_slice(&frame.sequence().to_be_bytes());
    out.extend_from_slice(frame.checksum());
    out.extend_from_slice(frame.payload());
    out
}

/// Decode one frame from the front of a concatenated stream. Returns the frame and bytes consumed.
/// The payload is `chunk_size` bytes (0 means the default), or whatever remains if the stream
/// is shorter (last frame).
pub fn decode_frame(bytes: &[u8], chunk_size: usize) -> Result<(Frame, usize), FrameDecodeError> {
    if bytes.len() <= FRAME_HEADER_LEN {
        return Err(FrameDecodeError::NeedMore);
    }
    let sequence = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let mut checksum = [0u8; DIGEST_LEN];
    checksum.copy_from_slice(&bytes[SEQ_SIZE..FRAME_HEADER_LEN]);
    let payload_len = effective_chunk_size(chunk_size).min(bytes.len() - FRAME_HEADER_LEN);
    let end = FRAME_HEADER_LEN + payload_len;
    let frame = Frame::from_parts(sequence, checksum, bytes[FRAME_HEADER_LEN..end].to_vec());
    if !frame.verify() {
        return Err(FrameDecodeError::IntegrityMismatch { sequence });
    }
    Ok((frame, end))
}

/// Error decoding a frame (short buffer or digest mismatch).
#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    #[error("need more bytes")]
    NeedMore,
    #[error("checksum mismatch on frame {sequence}")]
    IntegrityMismatch { sequence: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::frame;

    #[test]
    fn header_layout_is_bit_exact() {
        let f = Frame::new(0x0102_0304, b"xyz".to_vec());
        let bytes = encode_frame(&f);
        assert_eq!(bytes.len(), FRAME_HEADER_LEN + 3);
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
        assert_eq!(&bytes[4..36], f.checksum());
        assert_eq!(&bytes[36..], b"xyz");
    }

    #[test]
    fn decode_concatenated_stream() {
        let data: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        let frames = frame(&data, 100);
        let stream: Vec<u8> = frames.iter().flat_map(encode_frame).collect();

        let mut offset = 0;
        let mut decoded = Vec::new();
        while offset < stream.len() {
            let (f, n) = decode_frame(&stream[offset..], 100).unwrap();
            offset += n;
            decoded.push(f);
        }
        assert_eq!(decoded, frames);
    }

    #[test]
    fn partial_read_need_more() {
        let bytes = encode_frame(&Frame::new(1, b"payload".to_vec()));
        assert!(matches!(
            decode_frame(&bytes[..10], 1024),
            Err(FrameDecodeError::NeedMore)
        ));
        assert!(matches!(
            decode_frame(&bytes[..FRAME_HEADER_LEN], 1024),
            Err(FrameDecodeError::NeedMore)
        ));
    }

    #[test]
    fn corrupted_payload_is_detected() {
        let mut bytes = encode_frame(&Frame::new(7, b"payload".to_vec()));
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            decode_frame(&bytes, 1024),
            Err(FrameDecodeError::IntegrityMismatch { sequence: 7 })
        ));
    }

    #[test]
    fn zero_chunk_size_decodes_with_default() {
        let data: Vec<u8> = (0..1500u32).map(|i| (i % 253) as u8).collect();
        let frames = frame(&data, 0);
        assert_eq!(frames.len(), 2);
        let stream: Vec<u8> = frames.iter().flat_map(encode_frame).collect();

        let (first, n) = decode_frame(&stream, 0).unwrap();
        assert_eq!(first, frames[0]);
        let (second, m) = decode_frame(&stream[n..], 0).unwrap();
        assert_eq!(second, frames[1]);
        assert_eq!(n + m, stream.len());

        let single = frame(&[5; 100], 0);
        let (f, _) = decode_frame(&encode_frame(&single[0]), 0).unwrap();
        assert_eq!(f.payload(), &[5; 100][..]);
    }
}
