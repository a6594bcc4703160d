//! TheraLink triage kiosk firmware for the Raspberry Pi Pico 2 W.
//!
//! # Architecture
//!
//! One embassy executor runs everything:
//! - The **main loop** (this file) polls buttons, the joystick and, when
//!   the session engine asks for it, one of the two I²C-0 sensors, then
//!   advances the engine and flushes the OLED. It ticks every ~10 ms.
//! - `net::cyw43_task` / `net::net_task` drive the radio and the TCP/IP
//!   stack.
//! - `net::http_task`, `net::dns_task` and `net::dhcp_task` serve the
//!   captive web surface on the open soft AP at 192.168.4.1.
//!
//! The engine, the signal pipelines and every aggregate live in
//! `theralink-common`; this binary is wiring, drivers and sockets.
//!
//! # Buses
//!
//! - I²C 0 (GP0/GP1): MAX3010x pulse oximeter + TCS34725 color sensor.
//!   Only one is polled at a time; the engine's state decides which.
//! - I²C 1 (GP14/GP15): SSD1306 OLED, exclusive.
//!
//! # Controls
//!
//! - **A** (GP5): confirm / advance
//! - **B** (GP6): back / cancel
//! - **Joystick** (GP22 press, GP27 X axis): group report; level selection
//!   on the mood prompts

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]
// Crate-level lints (match lib.rs for consistency)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

// Modules only used in the binary (hardware-facing, not testable on host)
#[cfg(target_arch = "arm")]
mod drivers;
#[cfg(target_arch = "arm")]
mod input;
#[cfg(target_arch = "arm")]
mod net;
#[cfg(target_arch = "arm")]
mod oled;
#[cfg(target_arch = "arm")]
mod shared;

#[cfg(target_arch = "arm")]
mod app {
    use cyw43_pio::{DEFAULT_CLOCK_DIVIDER, PioSpi};
    use defmt::{info, unwrap, warn};
    use embassy_executor::Spawner;
    use embassy_net::{Ipv4Address, Ipv4Cidr, StackResources};
    use embassy_rp::adc::{self, Adc, Channel};
    use embassy_rp::bind_interrupts;
    use embassy_rp::gpio::{Input, Level, Output, Pull};
    use embassy_rp::i2c::{self, I2c};
    use embassy_rp::peripherals::{I2C0, PIO0};
    use embassy_rp::pio::Pio;
    use embassy_time::{Duration, Instant, Timer};
    use static_cell::StaticCell;
    use {defmt_rtt as _, panic_probe as _};

    use theralink_common::config::{AP_ADDR, AP_PREFIX_LEN, AP_SSID, TICK_MS};
    use theralink_common::ppg::PulsePart;
    use theralink_common::session::{SensorDemand, SessionEngine, TickInput};
    use theralink_pico2w::joystick::JoyAxis;

    use crate::drivers::max3010x::Max3010x;
    use crate::drivers::tcs34725::Tcs34725;
    use crate::input::PanelInputs;
    use crate::net;
    use crate::oled::Oled;
    use crate::shared::{Kiosk, SharedKiosk};

    // Program metadata for `picotool info`
    #[unsafe(link_section = ".bi_entries")]
    #[used]
    pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
        embassy_rp::binary_info::rp_program_name!(c"theralink"),
        embassy_rp::binary_info::rp_program_description!(c"Emotional triage kiosk on Pico 2 W"),
        embassy_rp::binary_info::rp_cargo_version!(),
        embassy_rp::binary_info::rp_program_build_attribute!(),
    ];

    bind_interrupts!(struct Irqs {
        ADC_IRQ_FIFO => adc::InterruptHandler;
        I2C0_IRQ => i2c::InterruptHandler<I2C0>;
        PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
    });

    /// Sensor probe retries before the kiosk gives up on a device.
    const PROBE_ATTEMPTS: usize = 3;

    /// OLED flush cadence; the display state is dirty-tracked anyway.
    const OLED_FLUSH_MS: u64 = 100;

    #[embassy_executor::main]
    async fn main(spawner: Spawner) {
        info!("TheraLink kiosk starting...");
        let p = embassy_rp::init(Default::default());

        // ======================================================================
        // Display (I2C1, exclusive)
        // ======================================================================
        let i2c1 = I2c::new_blocking(p.I2C1, p.PIN_15, p.PIN_14, i2c::Config::default());
        let mut screen = match Oled::new(i2c1) {
            Ok(o) => Some(o),
            Err(()) => {
                // Headless is survivable: /display mirrors the lines.
                warn!("OLED init failed, running headless");
                None
            }
        };

        // ======================================================================
        // Sensors (I2C0, shared between PPG and color in disjoint states)
        // ======================================================================
        let mut i2c0 = I2c::new_async(p.I2C0, p.PIN_1, p.PIN_0, Irqs, i2c::Config::default());

        let mut oxi = None;
        for attempt in 1..=PROBE_ATTEMPTS {
            match Max3010x::probe(&mut i2c0).await {
                Ok(d) => {
                    let name = match d.part() {
                        PulsePart::Max30100 => "MAX30100",
                        PulsePart::Max30102 => "MAX30102",
                    };
                    info!("pulse oximeter found: {}", name);
                    oxi = Some(d);
                    break;
                }
                Err(e) => {
                    warn!("pulse oximeter probe {}/{} failed: {:?}", attempt, PROBE_ATTEMPTS, e);
                    Timer::after_millis(100).await;
                }
            }
        }
        let mut rgb = None;
        for attempt in 1..=PROBE_ATTEMPTS {
            match Tcs34725::probe(&mut i2c0).await {
                Ok(d) => {
                    info!("color sensor found");
                    rgb = Some(d);
                    break;
                }
                Err(e) => {
                    warn!("color sensor probe {}/{} failed: {:?}", attempt, PROBE_ATTEMPTS, e);
                    Timer::after_millis(100).await;
                }
            }
        }

        // ======================================================================
        // Buttons and joystick
        // ======================================================================
        let btn_a = Input::new(p.PIN_5, Pull::Up);
        let btn_b = Input::new(p.PIN_6, Pull::Up);
        let joy_btn = Input::new(p.PIN_22, Pull::Up);
        let mut panel = PanelInputs::new();

        let mut adc_unit = Adc::new(p.ADC, Irqs, adc::Config::default());
        let mut joy_x = Channel::new_pin(p.PIN_27, Pull::None);
        let mut joy_axis = JoyAxis::new();

        // ======================================================================
        // Wi-Fi soft AP + network stack + servers
        // ======================================================================
        let fw = include_bytes!("../cyw43-firmware/43439A0.bin");
        let clm = include_bytes!("../cyw43-firmware/43439A0_clm.bin");

        let pwr = Output::new(p.PIN_23, Level::Low);
        let cs = Output::new(p.PIN_25, Level::High);
        let mut pio = Pio::new(p.PIO0, Irqs);
        let spi = PioSpi::new(
            &mut pio.common,
            pio.sm0,
            DEFAULT_CLOCK_DIVIDER,
            pio.irq0,
            cs,
            p.PIN_24,
            p.PIN_29,
            p.DMA_CH0,
        );

        static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
        let state = CYW43_STATE.init(cyw43::State::new());
        let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
        unwrap!(spawner.spawn(net::cyw43_task(runner)));
        control.init(clm).await;

        let config = embassy_net::Config::ipv4_static(embassy_net::StaticConfigV4 {
            address: Ipv4Cidr::new(
                Ipv4Address::new(AP_ADDR[0], AP_ADDR[1], AP_ADDR[2], AP_ADDR[3]),
                AP_PREFIX_LEN,
            ),
            dns_servers: heapless::Vec::new(),
            gateway: None,
        });
        // The stack wants entropy it can't get on its own; the unique chip
        // id is plenty for TCP sequence numbers on an isolated AP.
        let seed = embassy_rp::otp::get_chipid().unwrap_or(0x8273_5491_0213_6485);

        static RESOURCES: StaticCell<StackResources<8>> = StaticCell::new();
        let (stack, runner) =
            embassy_net::new(net_device, config, RESOURCES.init(StackResources::new()), seed);
        unwrap!(spawner.spawn(net::net_task(runner)));

        control.start_ap_open(AP_SSID, 5).await;
        info!("AP \"{}\" up, captive surface on 192.168.4.1", AP_SSID);

        static KIOSK: StaticCell<SharedKiosk> = StaticCell::new();
        let kiosk: &'static SharedKiosk =
            KIOSK.init(SharedKiosk::new(core::cell::RefCell::new(Kiosk::new())));

        unwrap!(spawner.spawn(net::http::http_task(stack, kiosk)));
        unwrap!(spawner.spawn(net::dns::dns_task(stack)));
        unwrap!(spawner.spawn(net::dhcp::dhcp_task(stack)));
        info!("HTTP/DNS/DHCP tasks spawned");

        // ======================================================================
        // Main poll loop
        // ======================================================================
        let part = oxi.as_ref().map_or(PulsePart::Max30102, Max3010x::part);
        let mut engine = SessionEngine::new(part);
        kiosk.lock(|c| engine.begin(&mut c.borrow_mut().display));

        let mut last_flush = Instant::now();
        let mut led_on = false;

        info!("Main loop starting");
        loop {
            let now = Instant::now();
            let events = panel.sample(now, btn_a.is_low(), btn_b.is_low(), joy_btn.is_low());

            let mut input = TickInput {
                now_ms: now.as_millis(),
                btn_a: events.a,
                btn_b: events.b,
                joy_click: events.joy_click,
                ..TickInput::default()
            };
            if let Ok(x) = adc_unit.read(&mut joy_x).await {
                input.joy_step = joy_axis.step(x);
            }

            // Read exactly the sensor the engine asked for.
            match engine.demand() {
                SensorDemand::Ppg => match oxi.as_mut() {
                    Some(dev) => match dev.read_ir(&mut i2c0).await {
                        Ok(Some(ir)) => input.ppg_ir = Some(ir),
                        Ok(None) => {}
                        Err(_) => input.ppg_bus_error = true,
                    },
                    None => input.ppg_bus_error = true,
                },
                SensorDemand::Color => {
                    if let Some(dev) = rgb.as_mut()
                        && let Ok(sample) = dev.read_norm(&mut i2c0).await
                    {
                        input.color = Some(sample);
                    }
                }
                SensorDemand::None => {}
            }

            kiosk.lock(|c| {
                let mut k = c.borrow_mut();
                let k = &mut *k;
                engine.poll(&input, &mut k.stats, &mut k.survey, &mut k.display);
            });

            // Flush changed display lines, off the lock.
            if last_flush.elapsed() >= Duration::from_millis(OLED_FLUSH_MS) {
                last_flush = Instant::now();
                let lines = kiosk.lock(|c| {
                    let mut k = c.borrow_mut();
                    if k.display.is_dirty() {
                        k.display.clear_dirty();
                        Some(k.display.copy_lines())
                    } else {
                        None
                    }
                });
                if let (Some(lines), Some(screen)) = (lines, screen.as_mut()) {
                    screen.render([&lines[0], &lines[1], &lines[2], &lines[3]]);
                }

                // Radio LED as the alive indicator.
                let blink = (input.now_ms / 1000).is_multiple_of(2);
                if blink != led_on {
                    led_on = blink;
                    control.gpio_set(0, led_on).await;
                }
            }

            Timer::after_millis(TICK_MS).await;
        }
    }
}

#[cfg(not(target_arch = "arm"))]
fn main() {}
