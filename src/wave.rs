//! Cyclic counter and per-tick output derivation.

use ehal::digital::v2::OutputPin;

use crate::duty::{Channel, DutyStore};

/// Ticks per output period; one tick is one percent of duty.
pub const CYCLE_LENGTH: u8 = 100;

/// Tick rate the binaries program their timebase to. With a 100-tick cycle
/// this puts the waveform period at 10 ms.
pub const TICK_HZ: u32 = 10_000;

/// Physical level that represents "active" on both output pins.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Whether a channel is active at `position` for a configured `threshold`.
///
/// The compare is inclusive and position 0 counts, so a threshold `t` of
/// 0..=99 gives `t + 1` active ticks per cycle -- 0 still pulses for one
/// tick -- and 100 is active for the whole cycle. Thresholds beyond the
/// cycle are clamped rather than trusted.
pub fn active_at(position: u8, threshold: u8) -> bool {
    position <= threshold.min(CYCLE_LENGTH - 1)
}

/// Owns the cycle position and the two output pins.
///
/// `tick` is the whole interrupt-context surface: advance the position,
/// derive both levels from the shared store, write both pins. Constant
/// time, no branches on operator input beyond the byte compares, nothing
/// that can block or allocate.
pub struct WaveDriver<'a, A, B> {
    store: &'a DutyStore,
    out_a: A,
    out_b: B,
    polarity: Polarity,
    position: u8,
}

impl<'a, A, B> WaveDriver<'a, A, B>
where
    A: OutputPin,
    B: OutputPin,
{
    pub fn new(store: &'a DutyStore, out_a: A, out_b: B, polarity: Polarity) -> Self {
        WaveDriver {
            store,
            out_a,
            out_b,
            polarity,
            position: 0,
        }
    }

    /// Advance one tick and refresh both pins.
    ///
    /// Thresholds are re-read every tick, so a store write is picked up by
    /// the very next invocation. Pins are rewritten even when the level did
    /// not change; the write is idempotent and keeps the path branch-light.
    pub fn tick(&mut self) {
        self.position = (self.position + 1) % CYCLE_LENGTH;
        let a = active_at(self.position, self.store.get(Channel::A));
        let b = active_at(self.position, self.store.get(Channel::B));
        drive(&mut self.out_a, a, self.polarity);
        drive(&mut self.out_b, b, self.polarity);
    }

    pub fn position(&self) -> u8 {
        self.position
    }
}

fn drive<P: OutputPin>(pin: &mut P, active: bool, polarity: Polarity) {
    let high = match polarity {
        Polarity::ActiveHigh => active,
        Polarity::ActiveLow => !active,
    };
    if high {
        let _ = pin.set_high();
    } else {
        let _ = pin.set_low();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;

    struct TestPin<'a> {
        level: &'a Cell<bool>,
    }

    impl OutputPin for TestPin<'_> {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.level.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.level.set(true);
            Ok(())
        }
    }

    fn driver<'a>(
        store: &'a DutyStore,
        a: &'a Cell<bool>,
        b: &'a Cell<bool>,
        polarity: Polarity,
    ) -> WaveDriver<'a, TestPin<'a>, TestPin<'a>> {
        WaveDriver::new(store, TestPin { level: a }, TestPin { level: b }, polarity)
    }

    fn active_ticks_per_cycle(threshold: u8) -> usize {
        let store = DutyStore::new();
        store.set(Channel::A, threshold);
        let a = Cell::new(false);
        let b = Cell::new(false);
        let mut drv = driver(&store, &a, &b, Polarity::ActiveHigh);
        (0..CYCLE_LENGTH).filter(|_| {
            drv.tick();
            a.get()
        }).count()
    }

    #[test]
    fn boundary_compare_is_inclusive() {
        assert!(active_at(0, 0));
        assert!(!active_at(1, 0));
        assert!(active_at(25, 25));
        assert!(!active_at(26, 25));
        // 100 and anything wilder clamp to the last position
        assert!(active_at(99, 100));
        assert!(active_at(99, 255));
    }

    #[test]
    fn full_cycle_returns_to_start() {
        for start in 0..CYCLE_LENGTH {
            let store = DutyStore::new();
            let a = Cell::new(false);
            let b = Cell::new(false);
            let mut drv = driver(&store, &a, &b, Polarity::ActiveHigh);
            for _ in 0..start {
                drv.tick();
            }
            assert_eq!(drv.position(), start);
            for _ in 0..CYCLE_LENGTH {
                drv.tick();
                assert!(drv.position() < CYCLE_LENGTH);
            }
            assert_eq!(drv.position(), start);
        }
    }

    #[test]
    fn active_ticks_track_threshold() {
        for t in 0..=100u8 {
            let expected = if t < 100 { t as usize + 1 } else { 100 };
            assert_eq!(active_ticks_per_cycle(t), expected, "threshold {}", t);
        }
    }

    #[test]
    fn zero_threshold_keeps_one_tick_pulse() {
        assert_eq!(active_ticks_per_cycle(0), 1);
    }

    #[test]
    fn hundred_threshold_is_always_active() {
        assert_eq!(active_ticks_per_cycle(100), 100);
    }

    #[test]
    fn overrange_threshold_clamps_to_full_scale() {
        assert_eq!(active_ticks_per_cycle(180), 100);
    }

    #[test]
    fn unconfigured_channel_keeps_minimal_window() {
        // no set() at all: reads as 0, i.e. the one-tick pulse
        let store = DutyStore::new();
        let a = Cell::new(false);
        let b = Cell::new(false);
        let mut drv = driver(&store, &a, &b, Polarity::ActiveHigh);
        let active = (0..CYCLE_LENGTH).filter(|_| {
            drv.tick();
            a.get()
        }).count();
        assert_eq!(active, 1);
    }

    #[test]
    fn quarter_duty_active_positions() {
        let store = DutyStore::new();
        store.set(Channel::A, 25);
        let a = Cell::new(false);
        let b = Cell::new(false);
        let mut drv = driver(&store, &a, &b, Polarity::ActiveHigh);
        let mut by_position = [false; CYCLE_LENGTH as usize];
        for _ in 0..CYCLE_LENGTH {
            drv.tick();
            by_position[drv.position() as usize] = a.get();
        }
        for (pos, active) in by_position.iter().enumerate() {
            assert_eq!(*active, pos <= 25, "position {}", pos);
        }
    }

    #[test]
    fn channels_are_independent() {
        let store = DutyStore::new();
        store.set(Channel::A, 30);
        store.set(Channel::B, 70);
        let a = Cell::new(false);
        let b = Cell::new(false);
        let mut drv = driver(&store, &a, &b, Polarity::ActiveHigh);

        let mut before = [false; CYCLE_LENGTH as usize];
        for _ in 0..CYCLE_LENGTH {
            drv.tick();
            before[drv.position() as usize] = b.get();
        }

        store.set(Channel::A, 80);
        let mut after = [false; CYCLE_LENGTH as usize];
        for _ in 0..CYCLE_LENGTH {
            drv.tick();
            after[drv.position() as usize] = b.get();
        }

        assert_eq!(before, after);
    }

    #[test]
    fn set_applies_on_next_tick() {
        let store = DutyStore::new();
        store.set(Channel::A, 50);
        let a = Cell::new(false);
        let b = Cell::new(false);
        let mut drv = driver(&store, &a, &b, Polarity::ActiveHigh);
        for _ in 0..11 {
            drv.tick();
        }
        assert!(a.get(), "still under the old threshold");

        store.set(Channel::A, 5);
        drv.tick();
        assert_eq!(drv.position(), 12);
        assert!(!a.get(), "new threshold must bite on the very next tick");
    }

    #[test]
    fn active_low_inverts_the_pin() {
        let store_h = DutyStore::new();
        let store_l = DutyStore::new();
        store_h.set(Channel::A, 25);
        store_l.set(Channel::A, 25);
        let (ah, bh) = (Cell::new(false), Cell::new(false));
        let (al, bl) = (Cell::new(false), Cell::new(false));
        let mut high = driver(&store_h, &ah, &bh, Polarity::ActiveHigh);
        let mut low = driver(&store_l, &al, &bl, Polarity::ActiveLow);
        for _ in 0..CYCLE_LENGTH {
            high.tick();
            low.tick();
            assert_eq!(ah.get(), !al.get());
        }
    }
}
