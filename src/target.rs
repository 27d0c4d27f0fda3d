//! A single target station.

use embedded_hal::i2c::I2c;

use crate::ir_receiver::IrReceiver;

/// One physical target: an IR receiver plus its round state.
///
/// `id` matches the rotary switch of the receiver module. Only the
/// [`TargetRegistry`](crate::TargetRegistry) changes `alive`.
pub struct Target<I> {
    id: u8,
    alive: bool,
    receiver: IrReceiver<I>,
}

impl<I: I2c> Target<I> {
    pub(crate) const fn new(id: u8, i2c: I) -> Self {
        Self {
            id,
            alive: true,
            receiver: IrReceiver::new(i2c, id),
        }
    }

    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Still eligible to be credited with a hit this round.
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) const fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    pub fn is_connected(&mut self) -> bool {
        self.receiver.is_connected()
    }

    pub fn is_receiving_ir(&mut self) -> bool {
        self.receiver.read() > 0
    }

    /// Raw receiver value: 0 for none, otherwise the gun that fired last.
    pub fn gun_number(&mut self) -> u8 {
        self.receiver.read()
    }
}
