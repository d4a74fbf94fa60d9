//! Duty thresholds shared between the console and the tick handler.

use core::sync::atomic::{AtomicU8, Ordering};

// Distinguishes "never configured" from an operator-supplied 0. Never a
// legal percentage, so it can live in the same byte.
const UNSET: u8 = 0xff;

/// One of the two output channels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Channel {
    A,
    B,
}

/// Last accepted duty percentage per channel.
///
/// Single producer (the console), single consumer (the tick handler); each
/// value is one byte, so relaxed atomic load/store is all the sharing needs.
/// The store trusts its caller and performs no range checks.
pub struct DutyStore {
    a: AtomicU8,
    b: AtomicU8,
}

impl DutyStore {
    pub const fn new() -> Self {
        DutyStore {
            a: AtomicU8::new(UNSET),
            b: AtomicU8::new(UNSET),
        }
    }

    fn cell(&self, ch: Channel) -> &AtomicU8 {
        match ch {
            Channel::A => &self.a,
            Channel::B => &self.b,
        }
    }

    /// Publish a new percentage; the caller keeps it within `0..=100`.
    /// Visible to the tick handler from its next read on.
    pub fn set(&self, ch: Channel, percent: u8) {
        self.cell(ch).store(percent, Ordering::Relaxed);
    }

    /// Last value written, or 0 while the channel is still unconfigured.
    pub fn get(&self, ch: Channel) -> u8 {
        match self.cell(ch).load(Ordering::Relaxed) {
            UNSET => 0,
            percent => percent,
        }
    }
}
