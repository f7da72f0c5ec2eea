use ld6002_protocol::{FRAME_CAPACITY, FrameAssembler, decode_frame, decode_report};

fn parse_hex(arg: &str) -> Option<Vec<u8>> {
    let digits: String = arg.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: decode <hex bytes>...");
        std::process::exit(2);
    }

    let mut decoder: FrameAssembler<FRAME_CAPACITY> = FrameAssembler::new();
    for arg in &args {
        let Some(bytes) = parse_hex(arg) else {
            eprintln!("not hex: {arg}");
            continue;
        };
        for b in bytes {
            match decoder.push(b) {
                Ok(Some(frame)) => match decode_frame(&frame) {
                    Ok((header, payload)) => {
                        println!("{header:?}");
                        println!("  {:?}", decode_report(header.msg_type, payload));
                    }
                    Err(err) => println!("rejected: {err}"),
                },
                Ok(None) => {}
                Err(err) => println!("framing: {err}"),
            }
        }
    }
    if decoder.is_syncing() {
        println!("{} bytes left in an unfinished frame", decoder.buffered());
    }
}
