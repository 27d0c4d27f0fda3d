//! Lift motor that moves the target rack between two end stops.
//!
//! The rack runs on a DC motor behind an H-bridge. Two photoreflectors mark
//! the bottom and top positions; reaching one end reverses the motor.

use embedded_hal::{
    digital::{
        self,
        OutputPin,
    },
    pwm::{
        self,
        SetDutyCycle,
    },
};

pub const MAX_POWER: u8 = u8::MAX;
/// Increment of one button press on the power setting.
pub const POWER_STEP: u8 = 10;
/// Raw reading below which a photoreflector sees the rack (12-bit ADC).
pub const DEFAULT_CLOSE_BELOW: u16 = 3500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Up,
    Down,
    /// Keep whatever direction the motor last ran in.
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveError {
    Pwm(pwm::ErrorKind),
    Pin(digital::ErrorKind),
}

fn pwm_err<E: pwm::Error>(e: E) -> DriveError {
    DriveError::Pwm(e.kind())
}

fn pin_err<E: digital::Error>(e: E) -> DriveError {
    DriveError::Pin(e.kind())
}

/// H-bridge motor: PWM reference sets the power, two pins set the direction.
pub struct LiftMotor<R, A, B> {
    reference: R,
    in1: A,
    in2: B,
    power: u8,
    direction: Direction,
}

impl<R, A, B> LiftMotor<R, A, B>
where
    R: SetDutyCycle,
    A: OutputPin,
    B: OutputPin,
{
    /// Start stopped, with both bridge inputs low.
    pub fn new(mut reference: R, mut in1: A, mut in2: B) -> Result<Self, DriveError> {
        in1.set_low().map_err(pin_err)?;
        in2.set_low().map_err(pin_err)?;
        reference.set_duty_cycle_fully_off().map_err(pwm_err)?;
        Ok(Self {
            reference,
            in1,
            in2,
            power: 0,
            direction: Direction::Up,
        })
    }

    /// Apply `power` in `direction`. Nothing is written when neither changes.
    pub fn set_power(&mut self, power: u8, direction: Direction) -> Result<(), DriveError> {
        if power == self.power
            && (direction == Direction::NoChange || direction == self.direction)
        {
            return Ok(());
        }
        if direction != Direction::NoChange {
            self.direction = direction;
        }

        self.reference
            .set_duty_cycle_fraction(u16::from(power), u16::from(MAX_POWER))
            .map_err(pwm_err)?;
        if self.direction == Direction::Down {
            self.in1.set_high().map_err(pin_err)?;
            self.in2.set_low().map_err(pin_err)?;
        } else {
            self.in2.set_high().map_err(pin_err)?;
            self.in1.set_low().map_err(pin_err)?;
        }
        self.power = power;
        Ok(())
    }

    pub const fn power(&self) -> u8 {
        self.power
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

/// Raw analog input, e.g. one ADC channel.
pub trait AnalogSensor {
    fn read_raw(&mut self) -> u16;
}

pub struct PhotoReflector<S> {
    sensor: S,
    close_below: u16,
}

impl<S: AnalogSensor> PhotoReflector<S> {
    pub const fn new(sensor: S) -> Self {
        Self::with_threshold(sensor, DEFAULT_CLOSE_BELOW)
    }

    pub const fn with_threshold(sensor: S, close_below: u16) -> Self {
        Self {
            sensor,
            close_below,
        }
    }

    pub fn value(&mut self) -> u16 {
        self.sensor.read_raw()
    }

    /// The rack is in front of the sensor.
    pub fn is_close(&mut self) -> bool {
        self.sensor.read_raw() < self.close_below
    }
}

/// Motor plus end stops.
pub struct LiftController<M, SB, ST> {
    motor: M,
    bottom: PhotoReflector<SB>,
    top: PhotoReflector<ST>,
}

impl<R, A, B, SB, ST> LiftController<LiftMotor<R, A, B>, SB, ST>
where
    R: SetDutyCycle,
    A: OutputPin,
    B: OutputPin,
    SB: AnalogSensor,
    ST: AnalogSensor,
{
    pub const fn new(
        motor: LiftMotor<R, A, B>,
        bottom: PhotoReflector<SB>,
        top: PhotoReflector<ST>,
    ) -> Self {
        Self { motor, bottom, top }
    }

    /// Drive at `power`, reversing at the end stops. Both stops active at once
    /// means the rack position is unknown, so the motor stops.
    ///
    /// Returns the power actually applied.
    pub fn update(&mut self, power: u8) -> Result<u8, DriveError> {
        let mut power = power;
        let mut direction = Direction::NoChange;
        if self.bottom.is_close() {
            direction = Direction::Up;
            if self.top.is_close() {
                power = 0;
            }
        } else if self.top.is_close() {
            direction = Direction::Down;
        }
        self.motor.set_power(power, direction)?;
        Ok(power)
    }

    /// Raw `(top, bottom)` readings for the status panel.
    pub fn reflector_values(&mut self) -> (u16, u16) {
        (self.top.value(), self.bottom.value())
    }

    pub const fn motor(&self) -> &LiftMotor<R, A, B> {
        &self.motor
    }
}

/// Manually set motor power, stepped by two buttons.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PowerSetting(u8);

impl PowerSetting {
    pub const fn new(power: u8) -> Self {
        Self(power)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// A step that would leave `0..=MAX_POWER` is ignored.
    pub const fn decrease(&mut self) {
        if let Some(power) = self.0.checked_sub(POWER_STEP) {
            self.0 = power;
        }
    }

    pub const fn increase(&mut self) {
        if let Some(power) = self.0.checked_add(POWER_STEP) {
            self.0 = power;
        }
    }
}
