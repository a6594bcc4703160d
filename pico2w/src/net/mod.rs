//! Wi-Fi and network server tasks.
//!
//! The CYW43 radio and the network stack each need a forever-running
//! driver task; the HTTP, DNS and DHCP servers are sibling tasks on the
//! same executor. Handlers never block on sensors: they only take the
//! shared-state lock for short synchronous sections.

pub mod dhcp;
pub mod dns;
pub mod http;

use cyw43_pio::PioSpi;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::{DMA_CH0, PIO0};

/// CYW43 radio driver loop.
#[embassy_executor::task]
pub async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

/// embassy-net stack loop.
#[embassy_executor::task]
pub async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}
