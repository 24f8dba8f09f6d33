//! Terminal raw-mode keyboard input for the interactive tools.
//!
//! `RawMode` is a scoped acquisition: entering it puts the terminal into raw
//! mode and dropping it restores the saved settings, including on early
//! return and panic unwind. Both binaries share it.

use std::io::{self, Read};
use std::mem::MaybeUninit;

/// Scoped raw-mode guard for stdin.
pub struct RawMode {
    saved: libc::termios,
}

impl RawMode {
    /// Switch stdin to raw mode. Fails when stdin is not a terminal.
    pub fn enter() -> io::Result<Self> {
        let saved = unsafe {
            let mut termios = MaybeUninit::<libc::termios>::uninit();
            if libc::tcgetattr(libc::STDIN_FILENO, termios.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            termios.assume_init()
        };

        let mut raw = saved;
        unsafe {
            libc::cfmakeraw(&mut raw);
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSADRAIN, &raw) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(Self { saved })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSADRAIN, &self.saved);
        }
    }
}

/// A decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Left,
    Right,
    Up,
    Down,
    Esc,
}

/// How long to wait for the rest of an escape sequence before deciding the
/// ESC was pressed on its own. Arrow keys arrive as one burst of bytes, so
/// this only ever delays a lone ESC.
const ESC_SEQUENCE_WAIT_MS: i32 = 25;

/// Block until one keypress arrives, decoding arrow-key escape sequences.
pub fn read_key() -> io::Result<Key> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    read_key_from(&mut input, || byte_pending(ESC_SEQUENCE_WAIT_MS))
}

fn read_key_from<R: Read>(
    input: &mut R,
    mut pending: impl FnMut() -> io::Result<bool>,
) -> io::Result<Key> {
    let first = read_byte(input)?;
    if first != 0x1b {
        return Ok(Key::Char(first as char));
    }

    // ESC [ <final> is an arrow key; a bare ESC with nothing behind it is
    // just ESC and must not block waiting for more input
    if !pending()? {
        return Ok(Key::Esc);
    }
    if read_byte(input)? != b'[' {
        return Ok(Key::Esc);
    }
    Ok(match read_byte(input)? {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        _ => Key::Esc,
    })
}

fn read_byte<R: Read>(input: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// True when stdin has a byte ready within the timeout.
fn byte_pending(timeout_ms: i32) -> io::Result<bool> {
    let mut fds = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    match unsafe { libc::poll(&mut fds, 1, timeout_ms) } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_esc_is_reported_without_waiting_for_more_bytes() {
        let mut input: &[u8] = &[0x1b];
        let key = read_key_from(&mut input, || Ok(false)).unwrap();
        assert_eq!(key, Key::Esc);
        assert!(input.is_empty());
    }

    #[test]
    fn arrow_sequences_decode() {
        let mut input: &[u8] = b"\x1b[A\x1b[B\x1b[C\x1b[Dq";
        let mut next = || read_key_from(&mut input, || Ok(true)).unwrap();
        assert_eq!(next(), Key::Up);
        assert_eq!(next(), Key::Down);
        assert_eq!(next(), Key::Right);
        assert_eq!(next(), Key::Left);
        assert_eq!(next(), Key::Char('q'));
    }

    #[test]
    fn unknown_escape_sequence_falls_back_to_esc() {
        let mut input: &[u8] = b"\x1b[Z";
        assert_eq!(read_key_from(&mut input, || Ok(true)).unwrap(), Key::Esc);

        let mut input: &[u8] = b"\x1bx";
        assert_eq!(read_key_from(&mut input, || Ok(true)).unwrap(), Key::Esc);
    }
}
