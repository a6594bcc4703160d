//! Captive DNS task: every name resolves to the kiosk.

use defmt::{debug, warn};
use embassy_net::Stack;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use theralink_common::config::AP_ADDR;
use theralink_pico2w::captive::dns;

const DNS_PORT: u16 = 53;

#[embassy_executor::task]
pub async fn dns_task(stack: Stack<'static>) -> ! {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buf = [0u8; 512];
    let mut tx_buf = [0u8; 512];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buf, &mut tx_meta, &mut tx_buf);
    if let Err(e) = socket.bind(DNS_PORT) {
        warn!("DNS bind failed: {:?}", e);
        core::future::pending::<()>().await;
    }

    let mut query = [0u8; 512];
    let mut reply = [0u8; 512];
    loop {
        let Ok((n, meta)) = socket.recv_from(&mut query).await else {
            continue;
        };
        if let Some(len) = dns::respond(&query[..n], AP_ADDR, &mut reply) {
            debug!("DNS answered {} bytes", len);
            let _ = socket.send_to(&reply[..len], meta).await;
        }
    }
}
