#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

use heapless::Vec;

pub mod command;
pub mod payload;

pub use command::{
    COMMAND_FRAME_LEN, Command, CommandPlan, ControlOp, FOLLOW_UP_DELAY_MS, STARTUP_SEQUENCE,
    STARTUP_SETTLE_MS, STARTUP_STEP_DELAY_MS, command_frame, encode_command_frame,
};
pub use payload::{
    CloudPoint, ConfigReport, InstallMethod, PointCloud, Report, Sensitivity, Target, TargetList,
    TriggerSpeed, WorkingMode, ZoneBounds, ZoneClass, ZonePresence, decode_report,
};

/// Start-of-frame marker.
pub const SOF: u8 = 0x01;
/// SOF + frame id + length + type + header checksum.
pub const HEADER_LEN: usize = 8;
/// Number of bytes that must be buffered before the declared payload length
/// (bytes 3..5) can be read.
pub const LENGTH_PROBE_LEN: usize = 7;
pub const PAYLOAD_CKSUM_LEN: usize = 1;
/// Reassembly buffer size used by hosts. Large enough for the biggest report
/// the sensor emits (1 + 2 + 2 + 2 + 1 + 1024 + 1 bytes).
pub const FRAME_CAPACITY: usize = 1152;
/// Largest payload that still fits a `FRAME_CAPACITY` buffer.
pub const MAX_PAYLOAD_LEN: usize = FRAME_CAPACITY - HEADER_LEN - PAYLOAD_CKSUM_LEN;

// Host → radar configuration messages.
/// Control message carrying a `Command` code; every outbound command uses it.
pub const MSG_CFG_CONTROL: u16 = 0x0201;
pub const MSG_CFG_AREA: u16 = 0x0202;
pub const MSG_CFG_HOLD_DELAY: u16 = 0x0203;
pub const MSG_CFG_Z_RANGE: u16 = 0x0204;
pub const MSG_CFG_LOW_POWER_TIME: u16 = 0x0205;

// Radar → host reports.
pub const MSG_TARGETS: u16 = 0x0A04;
pub const MSG_POINT_CLOUD: u16 = 0x0A08;
pub const MSG_PRESENCE: u16 = 0x0A0A;
pub const MSG_INTERFERENCE_ZONES: u16 = 0x0A0B;
pub const MSG_DETECTION_ZONES: u16 = 0x0A0C;
pub const MSG_HOLD_DELAY: u16 = 0x0A0D;
pub const MSG_SENSITIVITY: u16 = 0x0A0E;
pub const MSG_TRIGGER_SPEED: u16 = 0x0A0F;
pub const MSG_Z_RANGE: u16 = 0x0A10;
pub const MSG_INSTALL_METHOD: u16 = 0x0A11;
pub const MSG_LOW_POWER_MODE: u16 = 0x0A12;
pub const MSG_LOW_POWER_TIME: u16 = 0x0A13;
pub const MSG_WORKING_MODE: u16 = 0x0A14;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame id. The sensor does not correlate replies with it.
    pub id: u16,
    /// Declared payload length.
    pub len: u16,
    pub msg_type: u16,
}

impl FrameHeader {
    pub const fn frame_len(&self) -> usize {
        frame_len(self.len as usize)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Declared length does not fit the reassembly buffer.
    FrameTooLarge { expected: usize, capacity: usize },
    FrameTooSmall(usize),
    /// Byte arrived while the buffer was full and the length was still unknown.
    FrameOverflow,
    InvalidStart(u8),
    HeaderChecksum { calc: u8, rx: u8 },
    LengthMismatch { expected: usize, actual: usize },
    PayloadChecksum { calc: u8, rx: u8 },
    /// Frame was intact but its payload is shorter than its content implies.
    IncompletePayload {
        msg_type: u16,
        expected: usize,
        actual: usize,
    },
    BufferTooSmall,
    PayloadTooLarge,
    /// Control operation carries a level the sensor has no command for.
    UnsupportedControl,
}

impl Error {
    pub const fn kind(&self) -> &'static str {
        match self {
            Error::FrameTooLarge { .. } => "frame too large",
            Error::FrameTooSmall(_) => "frame too small",
            Error::FrameOverflow => "frame buffer overflow",
            Error::InvalidStart(_) => "bad start marker",
            Error::HeaderChecksum { .. } => "header checksum",
            Error::LengthMismatch { .. } => "length mismatch",
            Error::PayloadChecksum { .. } => "payload checksum",
            Error::IncompletePayload { .. } => "incomplete payload",
            Error::BufferTooSmall => "buffer too small",
            Error::PayloadTooLarge => "payload too large",
            Error::UnsupportedControl => "unsupported control operation",
        }
    }

    /// Reassembly-level failures; the stream resynchronises on the next SOF.
    pub const fn is_framing(&self) -> bool {
        matches!(
            self,
            Error::FrameTooLarge { .. } | Error::FrameTooSmall(_) | Error::FrameOverflow
        )
    }

    /// Validator rejections of a fully reassembled frame.
    pub const fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::InvalidStart(_)
                | Error::HeaderChecksum { .. }
                | Error::LengthMismatch { .. }
                | Error::PayloadChecksum { .. }
        )
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Error::FrameTooLarge { expected, capacity } => {
                write!(f, "frame too large: {expected} bytes (max {capacity})")
            }
            Error::FrameTooSmall(len) => write!(f, "invalid frame length: {len}"),
            Error::InvalidStart(sof) => write!(f, "invalid SOF: 0x{sof:02X}"),
            Error::HeaderChecksum { calc, rx } | Error::PayloadChecksum { calc, rx } => {
                write!(f, "{}: calc=0x{calc:02X} rx=0x{rx:02X}", self.kind())
            }
            Error::LengthMismatch { expected, actual } => {
                write!(f, "frame length mismatch: got={actual} expected={expected}")
            }
            Error::IncompletePayload {
                msg_type,
                expected,
                actual,
            } => write!(
                f,
                "incomplete payload for 0x{msg_type:04X}: got {actual} bytes, expected {expected}"
            ),
            _ => f.write_str(self.kind()),
        }
    }
}

/// Total on-wire length of a frame carrying `payload_len` bytes. The payload
/// checksum byte only exists when there is a payload.
pub const fn frame_len(payload_len: usize) -> usize {
    HEADER_LEN + payload_len + if payload_len > 0 { PAYLOAD_CKSUM_LEN } else { 0 }
}

/// XOR every byte, then invert.
pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Validate a complete frame and split it into its header and payload.
///
/// Checks run in wire order: start marker, header checksum, declared length
/// against the buffer, payload checksum.
pub fn decode_frame(buf: &[u8]) -> Result<(FrameHeader, &[u8]), Error> {
    if buf.is_empty() {
        return Err(Error::LengthMismatch {
            expected: HEADER_LEN,
            actual: 0,
        });
    }
    if buf[0] != SOF {
        return Err(Error::InvalidStart(buf[0]));
    }
    if buf.len() < HEADER_LEN {
        return Err(Error::LengthMismatch {
            expected: HEADER_LEN,
            actual: buf.len(),
        });
    }

    let calc = checksum(&buf[..HEADER_LEN - 1]);
    let rx = buf[HEADER_LEN - 1];
    if calc != rx {
        return Err(Error::HeaderChecksum { calc, rx });
    }

    let header = FrameHeader {
        id: read_u16_be(&buf[1..3]),
        len: read_u16_be(&buf[3..5]),
        msg_type: read_u16_be(&buf[5..7]),
    };
    let payload_len = header.len as usize;
    let expected = frame_len(payload_len);
    if expected != buf.len() {
        return Err(Error::LengthMismatch {
            expected,
            actual: buf.len(),
        });
    }

    let payload = &buf[HEADER_LEN..HEADER_LEN + payload_len];
    if payload_len > 0 {
        let calc = checksum(payload);
        let rx = buf[HEADER_LEN + payload_len];
        if calc != rx {
            return Err(Error::PayloadChecksum { calc, rx });
        }
    }

    Ok((header, payload))
}

/// Encode a frame with an arbitrary type and payload into `out`.
pub fn encode_frame(
    frame_id: u16,
    msg_type: u16,
    payload: &[u8],
    out: &mut [u8],
) -> Result<usize, Error> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLarge);
    }
    let total = frame_len(payload.len());
    if out.len() < total {
        return Err(Error::BufferTooSmall);
    }

    out[0] = SOF;
    out[1..3].copy_from_slice(&frame_id.to_be_bytes());
    out[3..5].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    out[5..7].copy_from_slice(&msg_type.to_be_bytes());
    out[HEADER_LEN - 1] = checksum(&out[..HEADER_LEN - 1]);

    if !payload.is_empty() {
        let end = HEADER_LEN + payload.len();
        out[HEADER_LEN..end].copy_from_slice(payload);
        out[end] = checksum(payload);
    }
    Ok(total)
}

/// Rebuilds frames from an arbitrarily chunked byte stream.
///
/// Bytes are discarded until a SOF arrives. Once seven bytes are buffered the
/// declared payload length fixes the frame size; the frame is returned as soon
/// as that many bytes are present and the assembler goes back to hunting for
/// SOF, whether or not the frame later validates. Any error drops the partial
/// frame.
pub struct FrameAssembler<const N: usize> {
    buffer: Vec<u8, N>,
    syncing: bool,
    expected_len: Option<usize>,
}

impl<const N: usize> FrameAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            syncing: false,
            expected_len: None,
        }
    }

    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8, N>>, Error> {
        if !self.syncing {
            if byte == SOF {
                self.buffer.clear();
                self.buffer.push(byte).map_err(|_| Error::FrameOverflow)?;
                self.syncing = true;
                self.expected_len = None;
            }
            return Ok(None);
        }

        if self.buffer.push(byte).is_err() {
            self.reset();
            return Err(Error::FrameOverflow);
        }

        if self.expected_len.is_none() && self.buffer.len() == LENGTH_PROBE_LEN {
            let expected = frame_len(read_u16_be(&self.buffer[3..5]) as usize);
            if expected > N {
                self.reset();
                return Err(Error::FrameTooLarge {
                    expected,
                    capacity: N,
                });
            }
            if expected < HEADER_LEN {
                self.reset();
                return Err(Error::FrameTooSmall(expected));
            }
            self.expected_len = Some(expected);
        }

        match self.expected_len {
            Some(expected) if self.buffer.len() >= expected => {
                let frame = core::mem::take(&mut self.buffer);
                self.reset();
                Ok(Some(frame))
            }
            _ => Ok(None),
        }
    }

    /// Push a whole chunk, reporting every completed frame or framing error
    /// in stream order.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_frame: F)
    where
        F: FnMut(Result<Vec<u8, N>, Error>),
    {
        for &byte in bytes {
            match self.push(byte) {
                Ok(Some(frame)) => on_frame(Ok(frame)),
                Ok(None) => {}
                Err(err) => on_frame(Err(err)),
            }
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.syncing = false;
        self.expected_len = None;
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<const N: usize> Default for FrameAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec as StdVec;

    fn frame(msg_type: u16, payload: &[u8]) -> StdVec<u8> {
        let mut out = [0u8; 64];
        let len = encode_frame(0, msg_type, payload, &mut out).unwrap();
        out[..len].to_vec()
    }

    fn collect<const N: usize>(asm: &mut FrameAssembler<N>, bytes: &[u8]) -> StdVec<StdVec<u8>> {
        let mut frames = StdVec::new();
        asm.feed(bytes, |res| {
            if let Ok(f) = res {
                frames.push(f.to_vec());
            }
        });
        frames
    }

    #[test]
    fn checksum_is_inverted_xor() {
        assert_eq!(checksum(&[]), 0xFF);
        assert_eq!(checksum(&[0x01, 0x00, 0x00, 0x00, 0x04, 0x02, 0x01]), 0xF9);
        assert_eq!(checksum(&[0x0A, 0x00, 0x00, 0x00]), 0xF5);
    }

    #[test]
    fn known_control_frame_validates() {
        let raw = [
            0x01, 0x00, 0x00, 0x00, 0x04, 0x02, 0x01, 0xF9, 0x0A, 0x00, 0x00, 0x00, 0xF5,
        ];
        let (header, payload) = decode_frame(&raw).unwrap();
        assert_eq!(header.id, 0);
        assert_eq!(header.len, 4);
        assert_eq!(header.msg_type, MSG_CFG_CONTROL);
        assert_eq!(payload, &[0x0A, 0x00, 0x00, 0x00]);
        assert_eq!(header.frame_len(), raw.len());
    }

    #[test]
    fn empty_payload_frame_is_header_only() {
        let raw = frame(MSG_TARGETS, &[]);
        assert_eq!(raw.len(), HEADER_LEN);
        let (header, payload) = decode_frame(&raw).unwrap();
        assert_eq!(header.len, 0);
        assert!(payload.is_empty());
    }

    #[test]
    fn rejections_follow_wire_order() {
        let good = frame(MSG_PRESENCE, &[1, 2, 3, 4]);

        let mut bad_sof = good.clone();
        bad_sof[0] = 0x02;
        assert_eq!(decode_frame(&bad_sof), Err(Error::InvalidStart(0x02)));

        let mut bad_header = good.clone();
        bad_header[7] ^= 0x01;
        assert!(matches!(
            decode_frame(&bad_header),
            Err(Error::HeaderChecksum { .. })
        ));

        let truncated = &good[..good.len() - 1];
        assert_eq!(
            decode_frame(truncated),
            Err(Error::LengthMismatch {
                expected: good.len(),
                actual: good.len() - 1
            })
        );

        let mut bad_payload = good.clone();
        bad_payload[HEADER_LEN] ^= 0x80;
        let err = decode_frame(&bad_payload).unwrap_err();
        assert!(matches!(err, Error::PayloadChecksum { .. }));
        assert!(err.is_integrity());
    }

    #[test]
    fn encode_rejects_small_buffer_and_oversized_payload() {
        let mut small = [0u8; HEADER_LEN];
        assert_eq!(
            encode_frame(0, MSG_CFG_CONTROL, &[1, 2, 3, 4], &mut small),
            Err(Error::BufferTooSmall)
        );
        let big = [0u8; MAX_PAYLOAD_LEN + 1];
        let mut out = [0u8; FRAME_CAPACITY + 8];
        assert_eq!(
            encode_frame(0, MSG_TARGETS, &big, &mut out),
            Err(Error::PayloadTooLarge)
        );
    }

    #[test]
    fn assembler_skips_noise_before_sof() {
        let raw = frame(MSG_PRESENCE, &[0; 16]);
        let mut stream = vec![0xAA, 0x55, 0x00, 0xFF];
        stream.extend_from_slice(&raw);
        let mut asm: FrameAssembler<FRAME_CAPACITY> = FrameAssembler::new();
        let frames = collect(&mut asm, &stream);
        assert_eq!(frames, vec![raw]);
        assert!(!asm.is_syncing());
        assert_eq!(asm.buffered(), 0);
    }

    #[test]
    fn assembler_emits_header_only_frame_at_eight_bytes() {
        let raw = frame(MSG_TARGETS, &[]);
        let mut asm: FrameAssembler<FRAME_CAPACITY> = FrameAssembler::new();
        for &b in &raw[..7] {
            assert!(asm.push(b).unwrap().is_none());
        }
        let out = asm.push(raw[7]).unwrap().unwrap();
        assert_eq!(&out[..], &raw[..]);
    }

    #[test]
    fn assembler_rejects_declared_length_beyond_capacity() {
        let raw = frame(MSG_TARGETS, &[0u8; 40]);
        let good = frame(MSG_PRESENCE, &[0, 0, 1, 0]);
        let mut stream = raw.clone();
        stream.extend_from_slice(&good);

        let mut asm: FrameAssembler<32> = FrameAssembler::new();
        let mut errors = StdVec::new();
        let mut frames = StdVec::new();
        asm.feed(&stream, |res| match res {
            Ok(f) => frames.push(f.to_vec()),
            Err(e) => errors.push(e),
        });
        assert_eq!(
            errors,
            [Error::FrameTooLarge {
                expected: raw.len(),
                capacity: 32
            }]
        );
        assert!(errors[0].is_framing());

        assert_eq!(frames, vec![good]);
        let (header, payload) = decode_frame(&frames[0]).unwrap();
        assert_eq!(header.msg_type, MSG_PRESENCE);
        assert_eq!(payload, &[0, 0, 1, 0]);
    }

    #[test]
    fn assembler_overflow_resyncs() {
        let mut asm: FrameAssembler<4> = FrameAssembler::new();
        for b in [SOF, 0, 0, 0] {
            assert!(asm.push(b).unwrap().is_none());
        }
        assert_eq!(asm.push(0x10), Err(Error::FrameOverflow));
        assert!(!asm.is_syncing());
    }

    #[test]
    fn corrupted_frame_does_not_poison_next_frame() {
        let mut first = frame(MSG_PRESENCE, &[1, 0, 0, 0]);
        first[HEADER_LEN + 1] ^= 0x40;
        let second = frame(MSG_PRESENCE, &[0, 0, 0, 1]);
        let mut stream = first.clone();
        stream.extend_from_slice(&second);

        let mut asm: FrameAssembler<FRAME_CAPACITY> = FrameAssembler::new();
        let frames = collect(&mut asm, &stream);
        assert_eq!(frames.len(), 2);
        assert!(matches!(
            decode_frame(&frames[0]),
            Err(Error::PayloadChecksum { .. })
        ));
        let (_, payload) = decode_frame(&frames[1]).unwrap();
        assert_eq!(payload, &[0, 0, 0, 1]);
    }

    fn arb_payload() -> impl Strategy<Value = StdVec<u8>> {
        proptest::collection::vec(any::<u8>(), 0..40)
    }

    proptest! {
        #[test]
        fn single_bit_flip_changes_checksum(
            bytes in proptest::collection::vec(any::<u8>(), 1..64),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut flipped = bytes.clone();
            let i = index.index(flipped.len());
            flipped[i] ^= 1 << bit;
            prop_assert_ne!(checksum(&bytes), checksum(&flipped));
        }

        #[test]
        fn split_points_do_not_change_frames(
            payloads in proptest::collection::vec(arb_payload(), 1..5),
            splits in proptest::collection::vec(1usize..17, 1..64),
        ) {
            let mut stream = StdVec::new();
            for (i, p) in payloads.iter().enumerate() {
                stream.extend_from_slice(&frame(0x0A00 + i as u16, p));
            }

            let mut whole: FrameAssembler<FRAME_CAPACITY> = FrameAssembler::new();
            let expected = collect(&mut whole, &stream);
            prop_assert_eq!(expected.len(), payloads.len());

            let mut chunked: FrameAssembler<FRAME_CAPACITY> = FrameAssembler::new();
            let mut got = StdVec::new();
            let mut rest = &stream[..];
            let mut sizes = splits.iter().cycle();
            while !rest.is_empty() {
                let n = (*sizes.next().unwrap()).min(rest.len());
                got.extend(collect(&mut chunked, &rest[..n]));
                rest = &rest[n..];
            }
            prop_assert_eq!(got, expected);
        }
    }
}
