//! Logging initialization, with optional syslog routing.

use std::ffi::{CStr, CString};
use std::io::{self, Write};
use std::sync::Once;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

static IDENT: &CStr = c"jsonfs";
static MESSAGE_FORMAT: &CStr = c"%s";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the CLI level when set. With `to_syslog`,
/// formatted events go to the system log instead of standard output.
///
/// # Arguments
/// * `level` - Default filter directive, e.g. `"info"`
/// * `to_syslog` - Route output to syslog
pub fn init(level: &str, to_syslog: bool) {
    let filter: EnvFilter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if to_syslog {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .without_time()
            .with_writer(SyslogMakeWriter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// `MakeWriter` that hands formatted events to `libc::syslog`.
struct SyslogMakeWriter;

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SyslogWriter
    }
}

struct SyslogWriter;

impl Write for SyslogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        send_to_syslog(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Forward each non-empty line of `buf` as one syslog message.
fn send_to_syslog(buf: &[u8]) {
    static OPEN: Once = Once::new();
    OPEN.call_once(|| unsafe {
        libc::openlog(IDENT.as_ptr(), libc::LOG_PID, libc::LOG_USER);
    });

    for line in buf.split(|b: &u8| *b == b'\n') {
        if line.is_empty() {
            continue;
        }
        // syslog takes a C string; interior NULs cannot survive.
        let cleaned: Vec<u8> = line.iter().copied().filter(|b: &u8| *b != 0).collect();
        if let Ok(message) = CString::new(cleaned) {
            unsafe {
                libc::syslog(libc::LOG_INFO, MESSAGE_FORMAT.as_ptr(), message.as_ptr());
            }
        }
    }
}
