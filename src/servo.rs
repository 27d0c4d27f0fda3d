//! Hobby servos that shake the target rack.

use embedded_hal::{
    delay::DelayNs,
    pwm::{
        self,
        SetDutyCycle,
    },
};
use rand_core::RngCore;

use crate::{
    Duration,
    Instant,
};

pub const FREQUENCY_HZ: u32 = 50;
/// One PWM period at [`FREQUENCY_HZ`].
pub const PERIOD_US: u16 = 20_000;
pub const MIN_ANGLE: i16 = -90;
pub const MAX_ANGLE: i16 = 90;

pub const WIGGLE_MIN_INTERVAL_MS: u32 = 1_000;
pub const WIGGLE_MAX_INTERVAL_MS: u32 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoError(pub pwm::ErrorKind);

/// Position servo on a 50 Hz PWM channel.
pub struct Servo<P> {
    pwm: P,
    angle: i16,
    min_pulse_us: u16,
    max_pulse_us: u16,
}

impl<P: SetDutyCycle> Servo<P> {
    /// `min_pulse_us` and `max_pulse_us` are the pulse widths at -90° and +90°.
    pub const fn new(pwm: P, min_pulse_us: u16, max_pulse_us: u16) -> Self {
        Self {
            pwm,
            angle: 0,
            min_pulse_us,
            max_pulse_us,
        }
    }

    /// Move to `angle` degrees, clamped to ±90.
    pub fn write(&mut self, angle: i16) -> Result<(), ServoError> {
        let angle = angle.clamp(MIN_ANGLE, MAX_ANGLE);
        self.pwm
            .set_duty_cycle_fraction(self.pulse_us(angle), PERIOD_US)
            .map_err(|e| ServoError(pwm::Error::kind(&e)))?;
        self.angle = angle;
        Ok(())
    }

    /// Last commanded angle.
    pub const fn angle(&self) -> i16 {
        self.angle
    }

    pub fn pulse_us(&self, angle: i16) -> u16 {
        let span = u32::from(self.max_pulse_us.saturating_sub(self.min_pulse_us));
        let offset = u32::from(angle.clamp(MIN_ANGLE, MAX_ANGLE).abs_diff(MIN_ANGLE));
        let range = u32::from(MAX_ANGLE.abs_diff(MIN_ANGLE));
        // span <= u16::MAX, so the quotient fits
        self.min_pulse_us + (span * offset / range) as u16
    }

    /// Power-on check: swing to `angle`, to `-angle`, then back to center.
    pub fn exercise<D: DelayNs>(
        &mut self,
        angle: i16,
        delay: &mut D,
        hold_ms: u32,
    ) -> Result<(), ServoError> {
        self.write(angle)?;
        delay.delay_ms(hold_ms);
        self.write(-angle)?;
        delay.delay_ms(hold_ms);
        self.write(0)
    }
}

/// Moves a servo to a random angle at random intervals.
#[derive(Debug, Clone, Copy)]
pub struct ServoWiggle {
    next_change: Instant,
}

impl Default for ServoWiggle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoWiggle {
    pub const fn new() -> Self {
        Self {
            next_change: Instant::from_ticks(0),
        }
    }

    pub const fn next_change(&self) -> Instant {
        self.next_change
    }

    /// Once `now` is past the scheduled change, write a new angle and
    /// schedule the next change relative to the previous one.
    ///
    /// Returns the angle written, if any.
    pub fn update<P, R>(
        &mut self,
        servo: &mut Servo<P>,
        now: Instant,
        rng: &mut R,
    ) -> Result<Option<i16>, ServoError>
    where
        P: SetDutyCycle,
        R: RngCore,
    {
        if now <= self.next_change {
            return Ok(None);
        }
        let interval = random_in(rng, WIGGLE_MIN_INTERVAL_MS, WIGGLE_MAX_INTERVAL_MS);
        self.next_change = self.next_change + Duration::from_ticks(u64::from(interval));

        let span = MAX_ANGLE.abs_diff(MIN_ANGLE);
        let angle = MIN_ANGLE + random_in(rng, 0, u32::from(span)) as i16;
        servo.write(angle)?;
        debug!("servo angle: {}", angle);
        Ok(Some(angle))
    }
}

/// Uniform-ish value in `low..=high`.
fn random_in<R: RngCore>(rng: &mut R, low: u32, high: u32) -> u32 {
    low + rng.next_u32() % (high - low + 1)
}

#[cfg(test)]
mod tests {
    use alloc::{
        rc::Rc,
        vec::Vec,
    };
    use core::{
        cell::RefCell,
        convert::Infallible,
    };

    use rand::{
        SeedableRng,
        rngs::SmallRng,
    };

    use super::*;

    #[derive(Clone, Default)]
    struct Pwm(Rc<RefCell<Vec<u16>>>);

    impl pwm::ErrorType for Pwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for Pwm {
        fn max_duty_cycle(&self) -> u16 {
            PERIOD_US
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.0.borrow_mut().push(duty);
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn at(ms: u64) -> Instant {
        Instant::from_ticks(ms)
    }

    #[test]
    fn angle_maps_to_pulse_width() {
        let servo = Servo::new(Pwm::default(), 500, 2400);
        assert_eq!(servo.pulse_us(-90), 500);
        assert_eq!(servo.pulse_us(0), 1450);
        assert_eq!(servo.pulse_us(90), 2400);
        assert_eq!(servo.pulse_us(120), 2400);
    }

    #[test]
    fn write_sets_duty_and_clamps() {
        let pwm = Pwm::default();
        let mut servo = Servo::new(pwm.clone(), 500, 2400);
        servo.write(90).unwrap();
        servo.write(-200).unwrap();
        assert_eq!(*pwm.0.borrow(), [2400, 500]);
        assert_eq!(servo.angle(), -90);
    }

    #[test]
    fn exercise_returns_to_center() {
        let pwm = Pwm::default();
        let mut servo = Servo::new(pwm.clone(), 500, 2400);
        servo.exercise(10, &mut NoDelay, 500).unwrap();
        assert_eq!(pwm.0.borrow().len(), 3);
        assert_eq!(servo.angle(), 0);
    }

    #[test]
    fn wiggle_waits_for_schedule() {
        let pwm = Pwm::default();
        let mut servo = Servo::new(pwm.clone(), 500, 2400);
        let mut wiggle = ServoWiggle::new();
        let mut rng = SmallRng::seed_from_u64(7);

        assert_eq!(wiggle.update(&mut servo, at(0), &mut rng).unwrap(), None);
        let angle = wiggle.update(&mut servo, at(1), &mut rng).unwrap().unwrap();
        assert!((MIN_ANGLE..=MAX_ANGLE).contains(&angle));

        let next = wiggle.next_change().ticks();
        assert!((1_000..=3_000).contains(&next));
        assert_eq!(wiggle.update(&mut servo, at(next), &mut rng).unwrap(), None);
        assert_eq!(pwm.0.borrow().len(), 1);
    }

    #[test]
    fn wiggle_intervals_and_angles_stay_in_range() {
        let mut servo = Servo::new(Pwm::default(), 500, 2400);
        let mut wiggle = ServoWiggle::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut previous = wiggle.next_change().ticks();

        for _ in 0..200 {
            let now = at(wiggle.next_change().ticks() + 1);
            let angle = wiggle.update(&mut servo, now, &mut rng).unwrap().unwrap();
            assert!((MIN_ANGLE..=MAX_ANGLE).contains(&angle));
            let next = wiggle.next_change().ticks();
            assert!((1_000..=3_000).contains(&(next - previous)));
            previous = next;
        }
    }
}
