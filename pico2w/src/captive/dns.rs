//! One-answer-fits-all DNS responder codec.
//!
//! Every query gets an A record pointing at the kiosk, which is what makes
//! phones pop their captive-portal sheet. The codec copies the question
//! section verbatim and appends a single compressed answer; it never
//! recurses and never says NXDOMAIN.

/// Offset of the question section in a DNS message.
const HEADER_LEN: usize = 12;

/// Answer TTL in seconds. Short, so clients re-ask after leaving the booth.
const TTL: u32 = 60;

/// Build a response to `query` into `out`, answering with `ip`.
///
/// Returns the response length, or `None` when the query is not a plain
/// question we can mirror (truncated header, zero questions, compressed
/// or oversized QNAME).
pub fn respond(
    query: &[u8],
    ip: [u8; 4],
    out: &mut [u8],
) -> Option<usize> {
    if query.len() < HEADER_LEN {
        return None;
    }
    // QR must be 0 (a query) and QDCOUNT at least 1.
    if query[2] & 0x80 != 0 {
        return None;
    }
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    if qdcount == 0 {
        return None;
    }

    let question_end = skip_qname(query, HEADER_LEN)?.checked_add(4)?;
    if question_end > query.len() {
        return None;
    }

    let answer_len = 16; // name pointer + type/class + ttl + rdlength + rdata
    let total = question_end + answer_len;
    if out.len() < total {
        return None;
    }

    // Header: same ID, response + recursion-available, one question, one answer.
    out[0] = query[0];
    out[1] = query[1];
    out[2] = 0x81; // QR=1, opcode 0, AA=0, TC=0, RD=1
    out[3] = 0x80; // RA=1, rcode 0
    out[4..6].copy_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    out[6..8].copy_from_slice(&1u16.to_be_bytes()); // ANCOUNT
    out[8..12].fill(0); // NSCOUNT, ARCOUNT

    // Question section, verbatim.
    out[HEADER_LEN..question_end].copy_from_slice(&query[HEADER_LEN..question_end]);

    // Answer: pointer to the question name, A/IN, TTL, 4-byte address.
    let a = question_end;
    out[a] = 0xC0;
    out[a + 1] = HEADER_LEN as u8;
    out[a + 2..a + 4].copy_from_slice(&1u16.to_be_bytes()); // TYPE A
    out[a + 4..a + 6].copy_from_slice(&1u16.to_be_bytes()); // CLASS IN
    out[a + 6..a + 10].copy_from_slice(&TTL.to_be_bytes());
    out[a + 10..a + 12].copy_from_slice(&4u16.to_be_bytes());
    out[a + 12..a + 16].copy_from_slice(&ip);

    Some(total)
}

/// Walk the label chain of the first QNAME; returns the offset just past
/// its terminating zero byte.
fn skip_qname(
    msg: &[u8],
    mut pos: usize,
) -> Option<usize> {
    loop {
        let len = *msg.get(pos)? as usize;
        if len == 0 {
            return Some(pos + 1);
        }
        // Compression pointers do not belong in a question we mirror.
        if len & 0xC0 != 0 {
            return None;
        }
        pos += 1 + len;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GW: [u8; 4] = [192, 168, 4, 1];

    /// A query for `example.com`, type A, class IN.
    fn example_query() -> std::vec::Vec<u8> {
        let mut q = std::vec![
            0xAB, 0xCD, // ID
            0x01, 0x00, // RD
            0x00, 0x01, // QDCOUNT
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        q.extend_from_slice(b"\x07example\x03com\x00");
        q.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        q
    }

    #[test]
    fn test_answers_with_gateway_ip() {
        let q = example_query();
        let mut out = [0u8; 512];
        let n = respond(&q, GW, &mut out).unwrap();

        // ID preserved, response bit set, one answer.
        assert_eq!(&out[0..2], &[0xAB, 0xCD]);
        assert_eq!(out[2] & 0x80, 0x80);
        assert_eq!(&out[6..8], &[0x00, 0x01]);
        // Question mirrored.
        assert_eq!(&out[12..q.len()], &q[12..]);
        // Answer ends in the gateway address.
        assert_eq!(&out[n - 4..n], &GW);
        // Pointer to the question name.
        assert_eq!(&out[q.len()..q.len() + 2], &[0xC0, 0x0C]);
    }

    #[test]
    fn test_any_name_gets_same_answer() {
        let mut q = std::vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        q.extend_from_slice(b"\x0cconnectivity\x05check\x06google\x03com\x00");
        q.extend_from_slice(&[0x00, 0x1C, 0x00, 0x01]); // AAAA question, still answered
        let mut out = [0u8; 512];
        let n = respond(&q, GW, &mut out).unwrap();
        assert_eq!(&out[n - 4..n], &GW);
    }

    #[test]
    fn test_rejects_truncated_and_responses() {
        let mut out = [0u8; 512];
        assert_eq!(respond(&[0u8; 4], GW, &mut out), None);

        let mut resp = example_query();
        resp[2] |= 0x80; // already a response
        assert_eq!(respond(&resp, GW, &mut out), None);

        let mut noq = example_query();
        noq[5] = 0; // QDCOUNT = 0
        assert_eq!(respond(&noq, GW, &mut out), None);
    }

    #[test]
    fn test_rejects_unterminated_qname() {
        let mut q = std::vec![0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        q.extend_from_slice(b"\x07example"); // runs off the end
        let mut out = [0u8; 512];
        assert_eq!(respond(&q, GW, &mut out), None);
    }
}
