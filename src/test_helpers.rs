//! Helpers shared by unit tests across modules.

use crate::byte_order::write_network_u32;

/// Encode `payload` with its 4-byte big-endian length prefix.
pub(crate) fn frame(payload: &[u8]) -> Vec<u8> {
    let len = u32::try_from(payload.len()).expect("payload fits in u32");
    let mut out = write_network_u32(len).to_vec();
    out.extend_from_slice(payload);
    out
}

#[test]
fn frame_prefixes_the_payload_length() {
    assert_eq!(frame(b"abc"), [0, 0, 0, 3, b'a', b'b', b'c']);
    assert_eq!(frame(b""), [0, 0, 0, 0]);
}
