//! IR receiver module on the shared I²C bus.
//!
//! Each module carries a rotary switch that selects its bus address. The
//! module answers a one-byte read with the number of the gun whose beam it
//! saw most recently, or 0 when nothing was received.

use embedded_hal::i2c::I2c;

/// Bus address of the receiver whose rotary switch is set to 0.
pub const BASE_ADDRESS: u8 = 8;

/// One IR receiver module, addressed as `BASE_ADDRESS + id`.
///
/// Rotary switches only select ids 0..=15; larger ids wrap instead of
/// overflowing and simply never answer.
pub struct IrReceiver<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> IrReceiver<I> {
    pub const fn new(i2c: I, id: u8) -> Self {
        Self {
            i2c,
            address: BASE_ADDRESS.wrapping_add(id),
        }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Gun number seen by the module, 0 if the read yielded no data.
    pub fn read(&mut self) -> u8 {
        let mut buf = [0_u8; 1];
        match self.i2c.read(self.address, &mut buf) {
            Ok(()) => buf[0],
            Err(_) => 0,
        }
    }

    /// Whether the module acknowledged a one-byte read, regardless of its value.
    pub fn is_connected(&mut self) -> bool {
        let mut buf = [0_u8; 1];
        self.i2c.read(self.address, &mut buf).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::{
        ErrorKind,
        ErrorType,
        NoAcknowledgeSource,
        Operation,
    };

    use super::*;

    /// Single device that answers with `value` or NACKs when `value` is `None`.
    struct OneDevice {
        address: u8,
        value: Option<u8>,
        reads: usize,
    }

    impl ErrorType for OneDevice {
        type Error = ErrorKind;
    }

    impl I2c for OneDevice {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            self.reads += 1;
            let value = match self.value {
                Some(v) if address == self.address => v,
                _ => return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            };
            for op in operations {
                if let Operation::Read(buf) = op {
                    buf.fill(value);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn address_is_offset_by_id() {
        let rx = IrReceiver::new(OneDevice { address: 0, value: None, reads: 0 }, 5);
        assert_eq!(rx.address(), 13);
    }

    #[test]
    fn out_of_range_id_wraps() {
        let rx = IrReceiver::new(OneDevice { address: 0, value: None, reads: 0 }, 250);
        assert_eq!(rx.address(), 2);
        let rx = IrReceiver::new(OneDevice { address: 0, value: None, reads: 0 }, u8::MAX);
        assert_eq!(rx.address(), 7);
    }

    #[test]
    fn read_returns_gun_number() {
        let mut rx = IrReceiver::new(OneDevice { address: 11, value: Some(2), reads: 0 }, 3);
        assert_eq!(rx.read(), 2);
        assert!(rx.is_connected());
    }

    #[test]
    fn silent_module_reads_zero_and_is_disconnected() {
        let mut rx = IrReceiver::new(OneDevice { address: 11, value: None, reads: 0 }, 3);
        assert_eq!(rx.read(), 0);
        assert!(!rx.is_connected());
    }

    #[test]
    fn connected_module_with_no_shot_reads_zero() {
        let mut rx = IrReceiver::new(OneDevice { address: 8, value: Some(0), reads: 0 }, 0);
        assert_eq!(rx.read(), 0);
        assert!(rx.is_connected());
    }

    #[test]
    fn each_call_is_one_transaction() {
        let mut rx = IrReceiver::new(OneDevice { address: 8, value: None, reads: 0 }, 0);
        rx.read();
        rx.is_connected();
        assert_eq!(rx.i2c.reads, 2);
    }
}
