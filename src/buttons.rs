//! Front-panel buttons that trim the lift motor power.

use embedded_hal::digital::InputPin;

use crate::lift::PowerSetting;

/// Two active-low buttons. A held button keeps stepping once per tick.
pub struct PowerButtons<P> {
    pub down: P,
    pub up: P,
}

impl<P: InputPin> PowerButtons<P> {
    pub const fn new(down: P, up: P) -> Self {
        Self { down, up }
    }

    /// Step `power` for every button currently held.
    pub fn apply(&mut self, power: &mut PowerSetting) -> Result<(), P::Error> {
        if self.down.is_low()? {
            power.decrease();
        }
        if self.up.is_low()? {
            power.increase();
        }
        Ok(())
    }
}
