//! Stack capture configuration
//!
//! # Environment Variables
//!
//! - `CERR_STACK_CAPTURE=0` - Disable stack capture entirely
//! - `CERR_STACK_DEPTH=<n>` - Frames kept per error, clamped to `MAX_FRAMES`
//!
//! The environment is read once, on the first capture. `set_global` overrides
//! it for the rest of the process.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::env::{env_get, env_get_bool};
use crate::kdebug;

/// Capacity of the per-error frame buffer.
pub const MAX_FRAMES: usize = 10;

/// Settings consulted by `Stack::capture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackConfig {
    /// Walk the stack at all
    pub capture: bool,

    /// Frames to keep, at most `MAX_FRAMES`
    pub depth: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            capture: true,
            depth: MAX_FRAMES,
        }
    }
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `CERR_STACK_CAPTURE` and `CERR_STACK_DEPTH`.
    pub fn from_env() -> Self {
        Self::from_vars("CERR_STACK_CAPTURE", "CERR_STACK_DEPTH")
    }

    fn from_vars(capture_key: &str, depth_key: &str) -> Self {
        Self::new()
            .capture(env_get_bool(capture_key, true))
            .depth(env_get(depth_key, MAX_FRAMES))
    }

    /// Enable or disable capture
    pub fn capture(mut self, enable: bool) -> Self {
        self.capture = enable;
        self
    }

    /// Set the frame depth (clamped to `MAX_FRAMES`)
    pub fn depth(mut self, n: usize) -> Self {
        self.depth = n.min(MAX_FRAMES);
        self
    }

    /// Frames a capture with these settings keeps.
    #[inline]
    pub fn effective_depth(&self) -> usize {
        if self.capture {
            self.depth.min(MAX_FRAMES)
        } else {
            0
        }
    }
}

static CAPTURE: AtomicBool = AtomicBool::new(true);
static DEPTH: AtomicUsize = AtomicUsize::new(MAX_FRAMES);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Load the process-wide settings from the environment.
///
/// Called automatically by the first capture.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    let config = StackConfig::from_env();
    store(config);
    kdebug!("cerror: stack capture={} depth={}", config.capture, config.depth);
}

/// Process-wide settings.
#[inline]
pub fn global() -> StackConfig {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    StackConfig {
        capture: CAPTURE.load(Ordering::Relaxed),
        depth: DEPTH.load(Ordering::Relaxed),
    }
}

/// Replace the process-wide settings. Wins over the environment.
pub fn set_global(config: StackConfig) {
    INITIALIZED.store(true, Ordering::SeqCst);
    store(config);
}

fn store(config: StackConfig) {
    CAPTURE.store(config.capture, Ordering::Relaxed);
    DEPTH.store(config.depth.min(MAX_FRAMES), Ordering::Relaxed);
}
