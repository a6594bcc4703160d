//! Captive DHCP task: leases addresses on the /24 and advertises the
//! kiosk as router and DNS.

use defmt::{info, warn};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Ipv4Address, Stack};
use theralink_common::config::AP_ADDR;
use theralink_pico2w::captive::dhcp::{self, LeasePool};

const SERVER_PORT: u16 = 67;
const CLIENT_PORT: u16 = 68;

#[embassy_executor::task]
pub async fn dhcp_task(stack: Stack<'static>) -> ! {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buf = [0u8; 1024];
    let mut tx_buf = [0u8; 1024];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buf, &mut tx_meta, &mut tx_buf);
    if let Err(e) = socket.bind(SERVER_PORT) {
        warn!("DHCP bind failed: {:?}", e);
        core::future::pending::<()>().await;
    }

    let mut pool = LeasePool::new();
    let mut msg = [0u8; 576];
    let mut reply = [0u8; 576];
    loop {
        let Ok((n, _meta)) = socket.recv_from(&mut msg).await else {
            continue;
        };
        let Some(client) = dhcp::parse(&msg[..n]) else {
            continue;
        };
        let Some(host) = pool.lease_for(client.mac) else {
            warn!("DHCP pool exhausted");
            continue;
        };
        let yiaddr = [AP_ADDR[0], AP_ADDR[1], AP_ADDR[2], host];
        if let Some(len) = dhcp::respond(&client, yiaddr, AP_ADDR, &mut reply) {
            info!("DHCP lease 192.168.4.{} for {}", host, client.mac);
            // The client has no address yet: answer on the broadcast.
            let to = IpEndpoint::new(Ipv4Address::BROADCAST.into(), CLIENT_PORT);
            let _ = socket.send_to(&reply[..len], to).await;
        }
    }
}
