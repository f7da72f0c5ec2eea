use ld6002_protocol::{Command, command_frame};

fn main() {
    for cmd in Command::ALL {
        let frame = command_frame(cmd);
        println!("0x{:02x} {:<28} {:02x?}", cmd.code(), cmd.name(), frame);
    }
}
