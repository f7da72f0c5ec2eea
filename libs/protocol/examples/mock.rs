use ld6002_protocol::{
    FRAME_CAPACITY, FrameAssembler, MSG_PRESENCE, MSG_SENSITIVITY, MSG_TARGETS, decode_frame,
    decode_report, encode_frame,
};

fn target_payload(targets: &[(f32, f32, f32, i32, i32)]) -> Vec<u8> {
    let mut out = (targets.len() as i32).to_le_bytes().to_vec();
    for &(x, y, z, velocity, cluster) in targets {
        for v in [x, y, z] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&velocity.to_le_bytes());
        out.extend_from_slice(&cluster.to_le_bytes());
    }
    out
}

fn main() {
    let mut stream = vec![0x55, 0xAA, 0x00];
    let mut raw = [0u8; FRAME_CAPACITY];

    let targets = target_payload(&[(0.42, 1.8, 1.1, 2, 0), (-0.7, 2.4, 0.9, 0, 1)]);
    let len = encode_frame(0, MSG_TARGETS, &targets, &mut raw).unwrap();
    stream.extend_from_slice(&raw[..len]);

    let mut presence = Vec::new();
    for v in [1u32, 0, 0, 1] {
        presence.extend_from_slice(&v.to_le_bytes());
    }
    let len = encode_frame(0, MSG_PRESENCE, &presence, &mut raw).unwrap();
    stream.extend_from_slice(&raw[..len]);

    let len = encode_frame(0, MSG_SENSITIVITY, &[1], &mut raw).unwrap();
    stream.extend_from_slice(&raw[..len]);

    println!("stream len {}", stream.len());

    let mut asm: FrameAssembler<FRAME_CAPACITY> = FrameAssembler::new();
    for chunk in stream.chunks(7) {
        asm.feed(chunk, |res| match res {
            Ok(frame) => match decode_frame(&frame) {
                Ok((header, payload)) => {
                    println!(
                        "frame type 0x{:04x} len {}: {:?}",
                        header.msg_type,
                        header.len,
                        decode_report(header.msg_type, payload)
                    );
                }
                Err(err) => println!("rejected: {err}"),
            },
            Err(err) => println!("framing: {err}"),
        });
    }
}
