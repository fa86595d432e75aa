#![no_std]

// crates/laskar-core/src/lib.rs: polled tick clock and fixed-timestep snake shared by the kernel and host tests.
pub mod clock;
pub mod config;
pub mod game_loop;
pub mod input;
pub mod rng;
pub mod snake;

pub mod abi {
    pub const WELCOME_BANNER: &str = "Welcome back to laskar";
    pub const SHELL_COMMANDS: [&str; 7] =
        ["help", "version", "ticks", "uptime", "clear", "echo", "snake"];

    pub const fn shell_prompt() -> &'static str {
        "laskar> "
    }

    /// Bytes a terminal expects for one output byte: `\n` goes out as `\r\n`.
    pub fn serial_bytes(byte: u8) -> impl Iterator<Item = u8> {
        (byte == b'\n')
            .then_some(b'\r')
            .into_iter()
            .chain(core::iter::once(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::abi;

    #[test]
    fn shell_surface_is_stable() {
        assert_eq!(abi::shell_prompt(), "laskar> ");
        assert!(abi::SHELL_COMMANDS.contains(&"snake"));
        assert_eq!(abi::WELCOME_BANNER, "Welcome back to laskar");
    }

    #[test]
    fn newline_goes_out_as_crlf() {
        let mut out = [0u8; 2];
        let mut len = 0;
        for byte in abi::serial_bytes(b'\n') {
            out[len] = byte;
            len += 1;
        }
        assert_eq!(&out[..len], b"\r\n");

        let mut plain = abi::serial_bytes(b'x');
        assert_eq!(plain.next(), Some(b'x'));
        assert_eq!(plain.next(), None);
        assert!(abi::serial_bytes(b'\r').eq([b'\r']));
    }
}
