//! Captive-portal wire codecs.
//!
//! The kiosk's soft AP answers every DNS question and every DHCP request
//! itself, always pointing clients at the gateway address. The packet
//! encode/decode lives here, free of sockets, so it can be unit-tested on
//! the host; the firmware half binds the UDP sockets and pumps these
//! functions.

pub mod dhcp;
pub mod dns;
