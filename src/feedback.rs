//! LED feedback for target events.
//!
//! One RGB LED sits next to each target. While a target is alive its LED
//! shows red as long as a beam is on it. A hit blinks the LED in the
//! shooter's color and then keeps that color until the next round.

use palette::Srgb;

use crate::{
    Duration,
    Instant,
    registry::TargetEvents,
};

const LEVEL: u8 = 40;

pub const OFF: Srgb<u8> = Srgb::new(0, 0, 0);
pub const RED: Srgb<u8> = Srgb::new(LEVEL, 0, 0);
pub const GREEN: Srgb<u8> = Srgb::new(0, LEVEL, 0);
pub const BLUE: Srgb<u8> = Srgb::new(0, 0, LEVEL);

/// Color sequence for the power-on LED check.
pub const SELF_TEST: [Srgb<u8>; 4] = [RED, GREEN, BLUE, OFF];

/// Number of on/off cycles after a hit.
pub const BLINK_TIMES: u8 = 3;
pub const BLINK_PHASE: Duration = Duration::from_ticks(300);

/// LED color of a gun. Unknown guns leave the LED dark.
pub const fn gun_color(gun_num: u8) -> Srgb<u8> {
    match gun_num {
        1 => RED,
        2 => BLUE,
        _ => OFF,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Blink {
    color: Srgb<u8>,
    /// Even phases show the color, odd phases are dark.
    phase: u8,
    phase_end: Instant,
}

/// [`TargetEvents`] handler that renders into an LED framebuffer.
///
/// Call [`advance`](HitFeedback::advance) every tick before the registry
/// update, then flush [`frame`](HitFeedback::frame) to the strip.
pub struct HitFeedback<const N: usize> {
    leds: [Srgb<u8>; N],
    blinks: [Option<Blink>; N],
    now: Instant,
}

impl<const N: usize> Default for HitFeedback<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HitFeedback<N> {
    pub const fn new() -> Self {
        Self {
            leds: [OFF; N],
            blinks: [None; N],
            now: Instant::from_ticks(0),
        }
    }

    /// Move blink animations forward to `now`.
    pub fn advance(&mut self, now: Instant) {
        self.now = now;
        for (led, slot) in self.leds.iter_mut().zip(self.blinks.iter_mut()) {
            let Some(blink) = slot else {
                continue;
            };
            while now >= blink.phase_end {
                blink.phase += 1;
                blink.phase_end = blink.phase_end + BLINK_PHASE;
                if blink.phase >= BLINK_TIMES * 2 {
                    *led = blink.color;
                    *slot = None;
                    break;
                }
            }
        }
    }

    /// Colors to show right now, one per target.
    pub fn frame(&self) -> [Srgb<u8>; N] {
        let mut frame = self.leds;
        for (out, blink) in frame.iter_mut().zip(&self.blinks) {
            if let Some(blink) = blink {
                *out = if blink.phase % 2 == 0 { blink.color } else { OFF };
            }
        }
        frame
    }

    pub fn is_blinking(&self, target_id: u8) -> bool {
        self.blinks
            .get(usize::from(target_id))
            .is_some_and(Option::is_some)
    }

    fn set(&mut self, target_id: u8, color: Srgb<u8>) {
        if let Some(led) = self.leds.get_mut(usize::from(target_id)) {
            *led = color;
        }
    }
}

impl<const N: usize> TargetEvents for HitFeedback<N> {
    fn on_init(&mut self) {
        debug!("clearing target leds");
        self.leds = [OFF; N];
        self.blinks = [None; N];
    }

    fn on_receive_ir(&mut self, target_id: u8, alive: bool) {
        if alive {
            self.set(target_id, RED);
        }
    }

    fn on_not_receive_ir(&mut self, target_id: u8, alive: bool) {
        if alive {
            self.set(target_id, OFF);
        }
    }

    fn on_hit(&mut self, target_id: u8, gun_num: u8) {
        let now = self.now;
        if let Some(slot) = self.blinks.get_mut(usize::from(target_id)) {
            *slot = Some(Blink {
                color: gun_color(gun_num),
                phase: 0,
                phase_end: now + BLINK_PHASE,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_ticks(ms)
    }

    #[test]
    fn gun_colors_fall_back_to_off() {
        assert_eq!(gun_color(1), RED);
        assert_eq!(gun_color(2), BLUE);
        assert_eq!(gun_color(0), OFF);
        assert_eq!(gun_color(9), OFF);
    }

    #[test]
    fn beam_lights_live_targets_only() {
        let mut fb = HitFeedback::<3>::new();
        fb.on_receive_ir(0, true);
        fb.on_receive_ir(1, false);
        assert_eq!(fb.frame(), [RED, OFF, OFF]);

        fb.on_not_receive_ir(0, true);
        assert_eq!(fb.frame()[0], OFF);
    }

    #[test]
    fn hit_blinks_then_holds_gun_color() {
        let mut fb = HitFeedback::<2>::new();
        fb.advance(at(1_000));
        fb.on_hit(1, 2);
        assert!(fb.is_blinking(1));

        let expected = [
            (1_000, BLUE),
            (1_299, BLUE),
            (1_300, OFF),
            (1_600, BLUE),
            (1_900, OFF),
            (2_200, BLUE),
            (2_500, OFF),
        ];
        for (ms, color) in expected {
            fb.advance(at(ms));
            assert_eq!(fb.frame()[1], color, "at {ms} ms");
        }

        fb.advance(at(2_800));
        assert!(!fb.is_blinking(1));
        assert_eq!(fb.frame(), [OFF, BLUE]);
    }

    #[test]
    fn late_advance_finishes_blink() {
        let mut fb = HitFeedback::<1>::new();
        fb.on_hit(0, 1);
        fb.advance(at(60_000));
        assert_eq!(fb.frame(), [RED]);
        assert!(!fb.is_blinking(0));
    }

    #[test]
    fn dead_target_keeps_hit_color() {
        let mut fb = HitFeedback::<1>::new();
        fb.on_hit(0, 2);
        fb.advance(at(5_000));
        fb.on_not_receive_ir(0, false);
        fb.on_receive_ir(0, false);
        assert_eq!(fb.frame(), [BLUE]);
    }

    #[test]
    fn init_clears_everything() {
        let mut fb = HitFeedback::<2>::new();
        fb.on_receive_ir(0, true);
        fb.on_hit(1, 1);
        fb.on_init();
        assert_eq!(fb.frame(), [OFF, OFF]);
        assert!(!fb.is_blinking(1));
    }

    #[test]
    fn out_of_range_ids_are_ignored() {
        let mut fb = HitFeedback::<1>::new();
        fb.on_receive_ir(5, true);
        fb.on_hit(5, 1);
        assert_eq!(fb.frame(), [OFF]);
        assert!(!fb.is_blinking(5));
    }
}
