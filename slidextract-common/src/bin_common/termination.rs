use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use signal_hook::{consts::signal::*, low_level};

/// Shared cancellation flag. Long running loops poll [`Cookie::is_terminating`] between
/// units of work and stop picking up new ones once it is set.
#[derive(Clone, Debug, Default)]
pub struct Cookie {
    count: Arc<AtomicUsize>,
}

impl Cookie {
    /// A cookie that is tripped by SIGINT and SIGTERM. The third signal falls back to the
    /// default handler, i.e., kills the process.
    pub fn new() -> Result<Self, std::io::Error> {
        let cookie = Self::detached();

        for flag in [SIGINT, SIGTERM] {
            let count = Arc::clone(&cookie.count);
            // SAFETY: this only uses atomic stuff and functions the crate itself is using
            // in signal handlers
            unsafe {
                low_level::register(flag, move || {
                    let prev = count.fetch_add(1, Ordering::SeqCst);
                    if prev >= 2 {
                        let _ = low_level::emulate_default_handler(flag);
                    }
                })?;
            };
        }

        Ok(cookie)
    }

    /// A cookie not connected to any signals, only [`Cookie::terminate`] trips it.
    pub fn detached() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn terminate(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_terminating(&self) -> bool {
        self.count.load(Ordering::SeqCst) >= 1
    }
}
