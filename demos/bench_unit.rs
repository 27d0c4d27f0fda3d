//! Bench firmware: runs a complete unit without network.
//!
//! Checks the receiver modules, blinks the LEDs through red/green/blue, swings
//! both servos, then runs the control loop: LED feedback for IR beams, random
//! servo movement, the lift between its end stops, and the status panel.
//! Buttons on GPIO21/GPIO13 trim the lift power.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::{
    error,
    info,
};
use embassy_executor::Spawner;
use embassy_time::{
    Duration,
    Timer,
};
use embedded_hal_bus::i2c::RefCellDevice;
use esp_backtrace as _;
use esp_hal::{
    Blocking,
    delay::Delay,
    gpio::{
        DriveMode,
        Level,
        Output,
        OutputConfig,
    },
    i2c::master::I2c,
    ledc::{
        LSGlobalClkSource,
        Ledc,
        LowSpeed,
        channel::{
            self,
            ChannelIFace,
        },
        timer::{
            self,
            TimerIFace,
        },
    },
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_println as _;
#[allow(clippy::wildcard_imports)]
use gallery_target_unit::*;
use gallery_target_unit::{
    feedback::SELF_TEST,
    lift::{
        LiftController,
        LiftMotor,
        PowerSetting,
    },
    network::NoStation,
    protocol::Offline,
    servo::{
        Servo,
        ServoWiggle,
    },
    status::StatusPanel,
};

extern crate alloc;

esp_bootloader_esp_idf::esp_app_desc!();

/// Selects the unit's address once it runs with a network transport.
const UNIT_ID: u8 = 2;
const TARGET_COUNT: usize = 9;

const TICK_MS: u64 = 100;
const SERVO_MIN_PULSE_US: u16 = 500;
const SERVO_MAX_PULSE_US: u16 = 2400;
const SERVO_TEST_ANGLE: i16 = 10;
const SELF_TEST_HOLD_MS: u32 = 500;

fn now() -> gallery_target_unit::Instant {
    gallery_target_unit::Instant::from_ticks(embassy_time::Instant::now().as_millis())
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    let peripherals = gallery_target_unit::init();
    let resources = split_resources!(peripherals);

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let mut delay = Delay::new();

    // ── Targets ─────────────────────────────────────────────────────────
    let bus = mk_static!(
        RefCell<I2c<'static, Blocking>>,
        RefCell::new(resources.ir_bus.into())
    );
    let config = UnitConfig {
        unit_id: UNIT_ID,
        target_count: TARGET_COUNT,
        network: None,
    };
    let mut targets = match TargetRegistry::begin(
        &config,
        |_| RefCellDevice::new(bus),
        Offline,
        HitFeedback::<TARGET_COUNT>::new(),
        &mut NoStation,
        &mut delay,
    ) {
        Ok(targets) => targets,
        Err(e) => panic!("target setup failed: {}", e),
    };

    for id in targets.error_targets() {
        error!("failed to connect target[{}]", id);
    }

    // ── LEDs ────────────────────────────────────────────────────────────
    let mut leds: Leds<'static, TARGET_COUNT> = resources.leds.into();
    for color in SELF_TEST {
        leds.fill(color);
        leds.update().await;
        Timer::after(Duration::from_millis(u64::from(SELF_TEST_HOLD_MS))).await;
    }

    // ── PWM: lift reference and servos ──────────────────────────────────
    let ledc = mk_static!(Ledc<'static>, Ledc::new(resources.pwm.ledc));
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

    let servo_timer = mk_static!(
        esp_hal::ledc::timer::Timer<'static, LowSpeed>,
        ledc.timer::<LowSpeed>(timer::Number::Timer0)
    );
    servo_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty14Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(gallery_target_unit::servo::FREQUENCY_HZ),
        })
        .unwrap();

    let motor_timer = mk_static!(
        esp_hal::ledc::timer::Timer<'static, LowSpeed>,
        ledc.timer::<LowSpeed>(timer::Number::Timer1)
    );
    motor_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty8Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_khz(20),
        })
        .unwrap();

    let mut pick_channel = ledc.channel(channel::Number::Channel0, resources.pwm.servo_pick);
    let mut volumes_channel = ledc.channel(channel::Number::Channel1, resources.pwm.servo_volumes);
    let mut motor_channel = ledc.channel(channel::Number::Channel2, resources.pwm.motor_ref);
    for (ch, timer) in [
        (&mut pick_channel, &*servo_timer),
        (&mut volumes_channel, &*servo_timer),
        (&mut motor_channel, &*motor_timer),
    ] {
        ch.configure(channel::config::Config {
            timer,
            duty_pct: 0,
            drive_mode: DriveMode::PushPull,
        })
        .unwrap();
    }

    let mut servo_pick = Servo::new(pick_channel, SERVO_MIN_PULSE_US, SERVO_MAX_PULSE_US);
    let mut servo_volumes = Servo::new(volumes_channel, SERVO_MIN_PULSE_US, SERVO_MAX_PULSE_US);
    for servo in [&mut servo_pick, &mut servo_volumes] {
        if let Err(e) = servo.exercise(SERVO_TEST_ANGLE, &mut delay, SELF_TEST_HOLD_MS) {
            error!("servo self-test failed: {}", e);
        }
    }

    // ── Lift ────────────────────────────────────────────────────────────
    let motor = LiftMotor::new(
        motor_channel,
        Output::new(resources.motor.in1, Level::Low, OutputConfig::default()),
        Output::new(resources.motor.in2, Level::Low, OutputConfig::default()),
    )
    .unwrap();
    let (bottom, top): (BottomReflector, TopReflector) = resources.reflectors.into();
    let mut lift = LiftController::new(motor, bottom, top);
    let mut buttons: PowerButtons<_> = resources.buttons.into();
    let mut power = PowerSetting::default();

    // ── Display ─────────────────────────────────────────────────────────
    let mut display: Display<'static> = resources.display.into();
    let panel = StatusPanel::new();
    panel.clear(&mut display).unwrap();
    display.set_backlight(true);

    let mut rng = BoardRng::new();
    let mut wiggles = [ServoWiggle::new(), ServoWiggle::new()];

    info!("unit {} running with {} targets", targets.unit_id(), targets.targets().len());

    loop {
        let now = now();

        targets.events_mut().advance(now);
        targets.update();
        leds.fill_from_iter(targets.events().frame());
        leds.update().await;

        for (wiggle, servo) in wiggles.iter_mut().zip([&mut servo_pick, &mut servo_volumes]) {
            if let Err(e) = wiggle.update(servo, now, &mut rng) {
                error!("servo update failed: {}", e);
            }
        }

        if buttons.apply(&mut power).is_err() {
            error!("failed to read power buttons");
        }
        let applied = match lift.update(power.get()) {
            Ok(applied) => applied,
            Err(e) => {
                error!("lift update failed: {}", e);
                0
            }
        };

        let (top, bottom) = lift.reflector_values();
        if panel.show_reflectors(&mut display, top, bottom).is_err() {
            error!("failed to draw reflector status");
        }
        if panel.show_motor(&mut display, applied).is_err() {
            error!("failed to draw motor status");
        }

        Timer::after(Duration::from_millis(TICK_MS)).await;
    }
}
