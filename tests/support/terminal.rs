// ABOUTME: A LocalTerminal double that counts raw-mode transitions.
// ABOUTME: Can report a fixed size or refuse to enter raw mode.

use panda::ssh::LocalTerminal;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct RecordingTerminal {
    size: Option<(u16, u16)>,
    refuse_raw: bool,
    enabled: AtomicUsize,
    restored: AtomicUsize,
}

impl RecordingTerminal {
    pub fn with_size(cols: u16, rows: u16) -> Self {
        Self {
            size: Some((cols, rows)),
            ..Self::default()
        }
    }

    pub fn refusing_raw_mode() -> Self {
        Self {
            refuse_raw: true,
            ..Self::default()
        }
    }

    pub fn enabled(&self) -> usize {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn restored(&self) -> usize {
        self.restored.load(Ordering::SeqCst)
    }
}

impl LocalTerminal for RecordingTerminal {
    fn size(&self) -> Option<(u16, u16)> {
        self.size
    }

    fn enable_raw_mode(&self) -> io::Result<()> {
        if self.refuse_raw {
            return Err(io::Error::other("not a terminal"));
        }
        self.enabled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn disable_raw_mode(&self) -> io::Result<()> {
        self.restored.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
