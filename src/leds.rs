//! WS2812 strip with one LED per target, driven by the RMT peripheral.

use defmt::error;
use embassy_time::{
    Duration,
    Timer,
};
use esp_hal::{
    Blocking,
    gpio::Level,
    rmt::{
        PulseCode,
        Tx,
    },
};
use palette::Srgb;

/// LED strip of `N` pixels, LED `i` mounted at target `i`.
///
/// Colors are staged in a framebuffer and sent with [`update`](Leds::update).
pub struct Leds<'a, const N: usize> {
    channel: Option<esp_hal::rmt::Channel<'a, Blocking, Tx>>,
    framebuffer: [Srgb<u8>; N],
}

impl<'a, const N: usize> Leds<'a, N> {
    pub const fn new(channel: esp_hal::rmt::Channel<'a, Blocking, Tx>) -> Self {
        Self {
            channel: Some(channel),
            framebuffer: [Srgb::new(0, 0, 0); N],
        }
    }

    /// Send the framebuffer to the strip.
    pub async fn update(&mut self) {
        let Some(channel) = self.channel.take() else {
            error!("led strip channel lost in an earlier transmission");
            return;
        };

        // GRB on the wire
        let pulses = self
            .framebuffer
            .iter()
            .flat_map(|c| {
                [c.green, c.red, c.blue]
                    .into_iter()
                    .flat_map(Self::byte_to_pulses)
            })
            .chain(core::iter::once(PulseCode::end_marker()))
            .collect::<alloc::vec::Vec<_>>();

        let transaction = match channel.transmit(&pulses) {
            Ok(t) => t,
            Err(e) => {
                error!("led strip transmit failed: {}", e);
                return;
            }
        };

        self.channel = Some(match transaction.wait() {
            Ok(ch) => ch,
            Err((err, ch)) => {
                error!("led strip transaction failed: {}", err);
                ch
            }
        });

        // latch
        Timer::after(Duration::from_micros(50)).await;
    }

    pub fn set(&mut self, index: usize, color: Srgb<u8>) {
        if let Some(led) = self.framebuffer.get_mut(index) {
            *led = color;
        }
    }

    pub fn fill(&mut self, color: Srgb<u8>) {
        self.framebuffer.fill(color);
    }

    pub fn clear(&mut self) {
        self.fill(Srgb::new(0, 0, 0));
    }

    pub fn fill_from_iter(&mut self, iter: impl IntoIterator<Item = Srgb<u8>>) {
        for (led, color) in self.framebuffer.iter_mut().zip(iter) {
            *led = color;
        }
    }

    pub const fn len(&self) -> usize {
        N
    }

    /// One bit at a 40 MHz RMT clock: '1' is 0.8 µs high, 0.45 µs low;
    /// '0' is 0.4 µs high, 0.85 µs low.
    const fn bit_to_pulse(bit: bool) -> PulseCode {
        if bit {
            PulseCode::new(Level::High, 32, Level::Low, 18)
        } else {
            PulseCode::new(Level::High, 16, Level::Low, 34)
        }
    }

    fn byte_to_pulses(byte: u8) -> [PulseCode; 8] {
        core::array::from_fn(|i| Self::bit_to_pulse(byte & (0x80 >> i) != 0))
    }
}
