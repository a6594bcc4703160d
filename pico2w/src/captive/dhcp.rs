//! Minimal DHCP server codec for the soft AP.
//!
//! Enough of BOOTP/DHCP to get a phone an address on the /24 and point its
//! router and DNS at the kiosk: DISCOVER is answered with OFFER, REQUEST
//! with ACK, everything else is ignored. Leases come from a tiny
//! MAC-indexed table; the pool is far larger than a booth's worth of
//! phones, so eviction is not handled.

/// First assigned host octet (192.168.4.16, .17, ...).
const POOL_BASE: u8 = 16;

/// Lease table capacity.
pub const MAX_LEASES: usize = 16;

/// Lease duration handed to clients, in seconds.
const LEASE_SECS: u32 = 86_400;

/// Fixed-field BOOTP length up to and including the magic cookie.
const OPTIONS_OFFSET: usize = 240;

const MAGIC: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// DHCP message kind, from option 53.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MsgKind {
    Discover,
    Request,
    Other,
}

/// The parts of a client message the responder needs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ClientMsg {
    pub kind: MsgKind,
    pub xid: [u8; 4],
    pub mac: [u8; 6],
}

/// Parse a client datagram. `None` for anything that is not a BOOTP
/// request with the DHCP magic cookie.
pub fn parse(msg: &[u8]) -> Option<ClientMsg> {
    if msg.len() < OPTIONS_OFFSET || msg[0] != 1 {
        return None;
    }
    if msg[236..240] != MAGIC {
        return None;
    }

    let mut kind = MsgKind::Other;
    let mut pos = OPTIONS_OFFSET;
    while pos < msg.len() {
        match msg[pos] {
            0 => pos += 1, // pad
            255 => break,
            code => {
                let len = *msg.get(pos + 1)? as usize;
                let value = msg.get(pos + 2..pos + 2 + len)?;
                if code == 53 && len == 1 {
                    kind = match value[0] {
                        1 => MsgKind::Discover,
                        3 => MsgKind::Request,
                        _ => MsgKind::Other,
                    };
                }
                pos += 2 + len;
            }
        }
    }

    let mut xid = [0u8; 4];
    xid.copy_from_slice(&msg[4..8]);
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&msg[28..34]);
    Some(ClientMsg { kind, xid, mac })
}

/// MAC → host-octet lease table.
#[derive(Default)]
pub struct LeasePool {
    macs: [Option<[u8; 6]>; MAX_LEASES],
}

impl LeasePool {
    pub const fn new() -> Self {
        Self { macs: [None; MAX_LEASES] }
    }

    /// Existing lease for `mac`, or a fresh one. `None` once the pool is
    /// exhausted.
    pub fn lease_for(
        &mut self,
        mac: [u8; 6],
    ) -> Option<u8> {
        let mut free = None;
        for (i, slot) in self.macs.iter().enumerate() {
            match slot {
                Some(m) if *m == mac => return Some(POOL_BASE + i as u8),
                None if free.is_none() => free = Some(i),
                _ => {}
            }
        }
        let i = free?;
        self.macs[i] = Some(mac);
        Some(POOL_BASE + i as u8)
    }
}

/// Build the OFFER/ACK for `client` into `out`. `yiaddr` is the leased
/// address, `server` the kiosk address (also announced as router and DNS).
/// Returns the datagram length, or `None` for non-DHCP traffic and
/// undersized buffers.
pub fn respond(
    client: &ClientMsg,
    yiaddr: [u8; 4],
    server: [u8; 4],
    out: &mut [u8],
) -> Option<usize> {
    let reply_type: u8 = match client.kind {
        MsgKind::Discover => 2, // OFFER
        MsgKind::Request => 5,  // ACK
        MsgKind::Other => return None,
    };

    // Fixed fields, then options; padded to the classic BOOTP minimum.
    let total = 300;
    if out.len() < total {
        return None;
    }
    out[..total].fill(0);

    out[0] = 2; // BOOTREPLY
    out[1] = 1; // ethernet
    out[2] = 6; // hlen
    out[4..8].copy_from_slice(&client.xid);
    out[10] = 0x80; // broadcast flag: client has no address yet
    out[16..20].copy_from_slice(&yiaddr);
    out[20..24].copy_from_slice(&server); // siaddr
    out[28..34].copy_from_slice(&client.mac);
    out[236..240].copy_from_slice(&MAGIC);

    let mut pos = OPTIONS_OFFSET;
    let mut put = |bytes: &[u8]| {
        out[pos..pos + bytes.len()].copy_from_slice(bytes);
        pos += bytes.len();
    };
    put(&[53, 1, reply_type]);
    put(&[54, 4]);
    put(&server); // server identifier
    put(&[51, 4]);
    put(&LEASE_SECS.to_be_bytes());
    put(&[1, 4, 255, 255, 255, 0]); // subnet mask
    put(&[3, 4]);
    put(&server); // router
    put(&[6, 4]);
    put(&server); // DNS
    put(&[255]);

    Some(total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GW: [u8; 4] = [192, 168, 4, 1];
    const MAC: [u8; 6] = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01];

    fn discover(
        mac: [u8; 6],
        msg_type: u8,
    ) -> std::vec::Vec<u8> {
        let mut m = std::vec![0u8; 240];
        m[0] = 1; // BOOTREQUEST
        m[1] = 1;
        m[2] = 6;
        m[4..8].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        m[28..34].copy_from_slice(&mac);
        m[236..240].copy_from_slice(&MAGIC);
        m.extend_from_slice(&[53, 1, msg_type, 255]);
        m
    }

    #[test]
    fn test_parse_discover_and_request() {
        let d = parse(&discover(MAC, 1)).unwrap();
        assert_eq!(d.kind, MsgKind::Discover);
        assert_eq!(d.xid, [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(d.mac, MAC);

        let r = parse(&discover(MAC, 3)).unwrap();
        assert_eq!(r.kind, MsgKind::Request);
    }

    #[test]
    fn test_parse_rejects_replies_and_garbage() {
        let mut reply = discover(MAC, 1);
        reply[0] = 2;
        assert_eq!(parse(&reply), None);

        let mut bad_magic = discover(MAC, 1);
        bad_magic[236] = 0;
        assert_eq!(parse(&bad_magic), None);

        assert_eq!(parse(&[1, 2, 3]), None);
    }

    #[test]
    fn test_lease_is_stable_per_mac() {
        let mut pool = LeasePool::new();
        let a = pool.lease_for(MAC).unwrap();
        let b = pool.lease_for([1, 2, 3, 4, 5, 6]).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.lease_for(MAC), Some(a));
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut pool = LeasePool::new();
        for i in 0..MAX_LEASES as u8 {
            assert!(pool.lease_for([0, 0, 0, 0, 0, i]).is_some());
        }
        assert_eq!(pool.lease_for([9, 9, 9, 9, 9, 9]), None);
    }

    #[test]
    fn test_offer_shape() {
        let client = parse(&discover(MAC, 1)).unwrap();
        let mut out = [0u8; 576];
        let n = respond(&client, [192, 168, 4, 16], GW, &mut out).unwrap();
        assert_eq!(n, 300);

        assert_eq!(out[0], 2); // BOOTREPLY
        assert_eq!(&out[4..8], &client.xid);
        assert_eq!(&out[16..20], &[192, 168, 4, 16]); // yiaddr
        assert_eq!(&out[28..34], &MAC);
        assert_eq!(&out[236..240], &MAGIC);
        // First option is the message type: OFFER.
        assert_eq!(&out[240..243], &[53, 1, 2]);
    }

    #[test]
    fn test_request_gets_ack() {
        let client = parse(&discover(MAC, 3)).unwrap();
        let mut out = [0u8; 576];
        respond(&client, [192, 168, 4, 16], GW, &mut out).unwrap();
        assert_eq!(&out[240..243], &[53, 1, 5]);
    }

    #[test]
    fn test_other_messages_ignored() {
        let client = ClientMsg { kind: MsgKind::Other, xid: [0; 4], mac: MAC };
        let mut out = [0u8; 576];
        assert_eq!(respond(&client, [0; 4], GW, &mut out), None);
    }
}
