//! # Remote control
//!
//! Decodes reports from the remote controller. The latest key and stick values are published in a
//! [`RemoteState`] readable from any task, and key presses are dispatched to registered key
//! callbacks.
//!
//! A key callback fires once per press: the key must be released (key 0 reported) before it can
//! fire again.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    collections::HashMap,
    convert::TryFrom,
    sync::{
        atomic::{AtomicU8, AtomicUsize, Ordering},
        Arc,
    },
};

use log::{debug, trace};

use comms_if::{
    eqpt::remote::{RemoteReport, KEY_NONE, STICK_CENTRE},
    msg::RecvMsg,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Lowest key a callback can be registered on.
pub const MIN_KEY: u8 = 1;

/// Highest key a callback can be registered on.
pub const MAX_KEY: u8 = 18;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Callback invoked with the pressed key.
pub type KeyCallback = Box<dyn FnMut(u8) + Send>;

/// Stick positions, 0 to 24 with 12 at centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sticks {
    pub left_x: u8,
    pub left_y: u8,
    pub right_x: u8,
    pub right_y: u8,
}

/// Latest values reported by the remote, shared between tasks.
///
/// Written only by the task polling the remote link, every other holder reads.
#[derive(Debug, Clone)]
pub struct RemoteState {
    inner: Arc<RemoteStateInner>,
}

#[derive(Debug)]
struct RemoteStateInner {
    key: AtomicU8,
    left_x: AtomicU8,
    left_y: AtomicU8,
    right_x: AtomicU8,
    right_y: AtomicU8,
    num_reports: AtomicUsize,
}

/// Remote report decoder and key callback registry.
pub struct RemoteCtrl {
    state: RemoteState,

    callbacks: HashMap<u8, KeyCallback>,

    /// True once the key has been released since the last callback fired
    key_up: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Sticks {
    fn default() -> Self {
        Self {
            left_x: STICK_CENTRE,
            left_y: STICK_CENTRE,
            right_x: STICK_CENTRE,
            right_y: STICK_CENTRE,
        }
    }
}

impl RemoteState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RemoteStateInner {
                key: AtomicU8::new(KEY_NONE),
                left_x: AtomicU8::new(STICK_CENTRE),
                left_y: AtomicU8::new(STICK_CENTRE),
                right_x: AtomicU8::new(STICK_CENTRE),
                right_y: AtomicU8::new(STICK_CENTRE),
                num_reports: AtomicUsize::new(0),
            }),
        }
    }

    /// The key currently held, 0 for none.
    pub fn key(&self) -> u8 {
        self.inner.key.load(Ordering::Relaxed)
    }

    pub fn sticks(&self) -> Sticks {
        Sticks {
            left_x: self.inner.left_x.load(Ordering::Relaxed),
            left_y: self.inner.left_y.load(Ordering::Relaxed),
            right_x: self.inner.right_x.load(Ordering::Relaxed),
            right_y: self.inner.right_y.load(Ordering::Relaxed),
        }
    }

    /// Number of valid reports received so far.
    pub fn num_reports(&self) -> usize {
        self.inner.num_reports.load(Ordering::Relaxed)
    }

    fn store(&self, report: &RemoteReport) {
        self.inner.key.store(report.key, Ordering::Relaxed);
        self.inner.left_x.store(report.left_x, Ordering::Relaxed);
        self.inner.left_y.store(report.left_y, Ordering::Relaxed);
        self.inner.right_x.store(report.right_x, Ordering::Relaxed);
        self.inner.right_y.store(report.right_y, Ordering::Relaxed);
        self.inner.num_reports.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for RemoteState {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteCtrl {
    pub fn new() -> Self {
        Self {
            state: RemoteState::new(),
            callbacks: HashMap::new(),
            key_up: true,
        }
    }

    /// Get a handle to the published remote state.
    pub fn state(&self) -> RemoteState {
        self.state.clone()
    }

    /// Register the callback for a key, replacing any previous one. Keys outside
    /// `MIN_KEY..=MAX_KEY` are ignored.
    pub fn register_key_callback<F>(&mut self, key: u8, callback: F)
    where
        F: FnMut(u8) + Send + 'static,
    {
        if !(MIN_KEY..=MAX_KEY).contains(&key) {
            debug!("Key {} out of range, callback not registered", key);
            return;
        }

        self.callbacks.insert(key, Box::new(callback));
    }

    /// Remove the callback for a key, if there is one.
    pub fn unregister_key_callback(&mut self, key: u8) {
        self.callbacks.remove(&key);
    }

    /// Handle a message received on the remote link.
    ///
    /// Anything that isn't a valid remote report is ignored.
    pub fn handle_msg(&mut self, msg: &RecvMsg<'_>) {
        match RemoteReport::try_from(msg) {
            Ok(r) => self.handle_report(&r),
            Err(e) => trace!("Ignoring remote message: {}", e),
        }
    }

    /// Publish a report and fire the pressed key's callback.
    pub fn handle_report(&mut self, report: &RemoteReport) {
        self.state.store(report);

        if report.key == KEY_NONE {
            self.key_up = true;
            return;
        }

        if !self.key_up {
            return;
        }

        if let Some(cb) = self.callbacks.get_mut(&report.key) {
            self.key_up = false;
            debug!("Remote key {} pressed", report.key);
            cb(report.key);
        }
    }
}

impl Default for RemoteCtrl {
    fn default() -> Self {
        Self::new()
    }
}
