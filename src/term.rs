use crate::keys::KeyInput;
use anyhow::{Context, Result};
use crossterm::terminal;
use crossterm::tty::IsTty;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::sync::Once;

// How long a lead ESC waits for the rest of a sequence before it counts as
// the Escape key. Sequence bytes arrive in one burst, so this only ever
// delays a bare Escape press.
const ESC_GRACE_MS: libc::c_int = 100;

/// Where key bytes come from during a selection session: standard input when
/// it is a terminal, otherwise a self-opened `/dev/tty`. Stdin is never
/// closed here; the tty file is closed on drop because we opened it.
pub enum KeySource {
    Stdin(io::Stdin),
    Tty(File),
}

impl Read for KeySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            KeySource::Stdin(stdin) => stdin.read(buf),
            KeySource::Tty(file) => file.read(buf),
        }
    }
}

impl KeyInput for KeySource {
    // Raw mode reads one byte at a time (VMIN=1, VTIME=0), so distinguishing
    // a lone Escape press from the head of a sequence needs a bounded poll
    // on the descriptor instead of another blocking read.
    fn byte_pending(&mut self) -> bool {
        let fd = match self {
            KeySource::Stdin(stdin) => stdin.as_raw_fd(),
            KeySource::Tty(file) => file.as_raw_fd(),
        };
        let mut pollfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&mut pollfd, 1, ESC_GRACE_MS) };
        ready > 0 && (pollfd.revents & (libc::POLLIN | libc::POLLHUP)) != 0
    }
}

pub fn open_key_source() -> Result<KeySource> {
    let stdin = io::stdin();
    if stdin.is_tty() {
        Ok(KeySource::Stdin(stdin))
    } else {
        let tty = File::open("/dev/tty").context("open /dev/tty for interactive input")?;
        Ok(KeySource::Tty(tty))
    }
}

pub fn stdin_is_tty() -> bool {
    io::stdin().is_tty()
}

/// Terminal size as (columns, rows), with the same fallback the rendering
/// code assumes for dumb terminals.
pub fn size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

/// Scoped raw-mode handle. Entering raw mode also disables line wrap and
/// hides the cursor; all three are undone on drop so every exit path,
/// including panics, leaves the terminal usable.
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode().context("enable raw terminal mode")?;
        let mut err = io::stderr();
        let _ = err.write_all(b"\x1b[?7l\x1b[?25l");
        let _ = err.flush();
        Ok(Self { active: true })
    }

    fn restore(&mut self) {
        if self.active {
            self.active = false;
            let _ = terminal::disable_raw_mode();
            let mut err = io::stderr();
            let _ = err.write_all(b"\x1b[?7h\x1b[?25h");
            let _ = err.flush();
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

static INIT_CTRL_C: Once = Once::new();

/// Best-effort terminal restore if SIGINT arrives outside the raw-mode read
/// path (inside it, Ctrl-C is just a byte). Installed at most once.
pub fn install_sigint_restore() {
    INIT_CTRL_C.call_once(|| {
        let _ = ctrlc::set_handler(|| {
            let _ = terminal::disable_raw_mode();
            let mut err = io::stderr();
            let _ = err.write_all(b"\x1b[?7h\x1b[?25h");
            let _ = err.flush();
            std::process::exit(130);
        });
    });
}
