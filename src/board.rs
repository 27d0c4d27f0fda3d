//! ESP32-S3 wiring of the target unit.
//!
//! ```rust,ignore
//! let peripherals = gallery_target_unit::init();
//! let resources = gallery_target_unit::split_resources!(peripherals);
//!
//! let bus: I2c<'static, Blocking> = resources.ir_bus.into();
//! let leds: Leds<'static, 9> = resources.leds.into();
//! let display: Display<'static> = resources.display.into();
//! ```

use core::cell::RefCell;

use esp_hal::{
    Blocking,
    analog::adc::{
        Adc,
        AdcChannel,
        AdcConfig,
        AdcPin,
        Attenuation,
    },
    assign_resources,
    clock::{
        Clock,
        CpuClock,
    },
    gpio::{
        Input,
        InputConfig,
        Level,
        Output,
        OutputConfig,
        Pull,
    },
    i2c::master::I2c,
    peripherals::{
        ADC1,
        GPIO1,
        GPIO2,
    },
    rmt::{
        Rmt,
        Tx,
        TxChannelConfig,
        TxChannelCreator as _,
    },
    rng::Rng,
    rom,
    time::Rate,
};

use crate::{
    Leds,
    buttons::PowerButtons,
    lift::{
        AnalogSensor,
        PhotoReflector,
    },
};

/// IR receiver modules only answer at standard mode.
const IR_BUS_FREQUENCY_KHZ: u32 = 100;

/// Place a value in a `static` exactly once and return `&'static mut`.
#[macro_export]
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}

// ── Pin / peripheral assignments ────────────────────────────────────────────

assign_resources! {
    pub Resources<'d> {
        ir_bus: IrBusResources<'d> {
            sda: GPIO39,
            scl: GPIO40,
            i2c: I2C0,
        },
        leds: LedResources<'d> {
            power: GPIO17,
            io: GPIO18,
            rmt: RMT,
        },
        display: DisplayResources<'d> {
            dc: GPIO15,
            rst: GPIO7,
            sck: GPIO4,
            cs: GPIO6,
            miso: GPIO16,
            mosi: GPIO5,
            spi: SPI2,
            dma: DMA_CH0,
            backlight: GPIO19,
        },
        pwm: PwmResources<'d> {
            ledc: LEDC,
            motor_ref: GPIO41,
            servo_pick: GPIO10,
            servo_volumes: GPIO9,
        },
        motor: MotorResources<'d> {
            in1: GPIO42,
            in2: GPIO47,
        },
        reflectors: ReflectorResources<'d> {
            bottom: GPIO1,
            top: GPIO2,
            adc: ADC1,
        },
        buttons: ButtonResources<'d> {
            down: GPIO21,
            up: GPIO13,
        }
    }
}

// ── Board initialisation ────────────────────────────────────────────────────

/// The S3 has to pass through an intermediate frequency before the target.
fn set_cpu_clock(cpu_clock_speed: CpuClock) {
    let _ = esp_hal::peripherals::SYSTEM::regs()
        .sysclk_conf()
        .modify(|_, w| unsafe { w.soc_clk_sel().bits(1) });
    let _ = esp_hal::peripherals::SYSTEM::regs()
        .cpu_per_conf()
        .modify(|_, w| unsafe {
            let _ = w.pll_freq_sel().set_bit();
            w.cpuperiod_sel().bits(match cpu_clock_speed {
                CpuClock::_80MHz => 0,
                CpuClock::_160MHz => 1,
                CpuClock::_240MHz => 2,
                _ => panic!("Unsupported CPU clock speed"),
            })
        });

    rom::ets_update_cpu_frequency_rom(cpu_clock_speed.frequency().as_mhz());
}

/// Initialise the unit's hardware and return the raw peripheral set.
///
/// Call this once at the top of `main`, then split the peripherals with
/// [`split_resources!`].
#[must_use]
pub fn init() -> esp_hal::peripherals::Peripherals {
    set_cpu_clock(CpuClock::_160MHz);
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    esp_hal::init(config)
}

// ── Resource → peripheral conversions ───────────────────────────────────────

impl From<esp_hal::peripherals::Peripherals> for Resources<'_> {
    fn from(peripherals: esp_hal::peripherals::Peripherals) -> Self {
        split_resources!(peripherals)
    }
}

/// Shared bus of the IR receiver modules. Split it per target with
/// `embedded_hal_bus::i2c::RefCellDevice`.
impl<'a> From<IrBusResources<'a>> for I2c<'a, Blocking> {
    fn from(res: IrBusResources<'a>) -> Self {
        let config = esp_hal::i2c::master::Config::default()
            .with_frequency(Rate::from_khz(IR_BUS_FREQUENCY_KHZ));
        I2c::new(res.i2c, config)
            .unwrap()
            .with_sda(res.sda)
            .with_scl(res.scl)
    }
}

impl<'a> From<LedResources<'a>> for esp_hal::rmt::Channel<'a, Blocking, Tx> {
    fn from(res: LedResources<'a>) -> Self {
        let _ws_power = Output::new(res.power, Level::High, OutputConfig::default());
        let rmt = Rmt::new(res.rmt, Rate::from_mhz(40)).unwrap();
        let tx_config = TxChannelConfig::default().with_clk_divider(1);
        rmt.channel0.configure_tx(res.io, tx_config).unwrap()
    }
}

impl<'a, const N: usize> From<LedResources<'a>> for Leds<'a, N> {
    fn from(res: LedResources<'a>) -> Self {
        Leds::new(res.into())
    }
}

impl From<ButtonResources<'static>> for PowerButtons<Input<'static>> {
    fn from(res: ButtonResources<'static>) -> Self {
        let pull_up = InputConfig::default().with_pull(Pull::Up);
        Self::new(Input::new(res.down, pull_up), Input::new(res.up, pull_up))
    }
}

// ── Photoreflectors ─────────────────────────────────────────────────────────

type Adc1 = Adc<'static, ADC1<'static>, Blocking>;

/// One ADC1 channel; both reflectors share the converter.
pub struct AdcSensor<PIN> {
    adc: &'static RefCell<Adc1>,
    pin: AdcPin<PIN, ADC1<'static>>,
}

impl<PIN: AdcChannel> AnalogSensor for AdcSensor<PIN> {
    fn read_raw(&mut self) -> u16 {
        let mut adc = self.adc.borrow_mut();
        loop {
            if let Ok(value) = adc.read_oneshot(&mut self.pin) {
                return value;
            }
        }
    }
}

pub type BottomReflector = PhotoReflector<AdcSensor<GPIO1<'static>>>;
pub type TopReflector = PhotoReflector<AdcSensor<GPIO2<'static>>>;

impl From<ReflectorResources<'static>> for (BottomReflector, TopReflector) {
    fn from(res: ReflectorResources<'static>) -> Self {
        let mut config = AdcConfig::new();
        let bottom = config.enable_pin(res.bottom, Attenuation::_11dB);
        let top = config.enable_pin(res.top, Attenuation::_11dB);
        let adc = crate::mk_static!(RefCell<Adc1>, RefCell::new(Adc::new(res.adc, config)));
        (
            PhotoReflector::new(AdcSensor { adc, pin: bottom }),
            PhotoReflector::new(AdcSensor { adc, pin: top }),
        )
    }
}

// ── Randomness ──────────────────────────────────────────────────────────────

/// Hardware RNG behind the `rand_core` interface used by the servo wiggle.
pub struct BoardRng(Rng);

impl BoardRng {
    pub fn new() -> Self {
        Self(Rng::new())
    }
}

impl Default for BoardRng {
    fn default() -> Self {
        Self::new()
    }
}

impl rand_core::RngCore for BoardRng {
    fn next_u32(&mut self) -> u32 {
        self.0.random()
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
