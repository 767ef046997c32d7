//! Builders for length-prefixed wire bytes.

use framelink::byte_order::write_network_u32;

/// Encode `payload` with a 4-byte big-endian length prefix.
///
/// # Panics
///
/// Panics if the payload is longer than `u32::MAX` bytes.
#[must_use]
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let len = u32::try_from(payload.len()).expect("payload length fits in u32");
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(&write_network_u32(len));
    out.extend_from_slice(payload);
    out
}

/// Concatenate the framed encodings of every payload.
#[must_use]
pub fn frames<P: AsRef<[u8]>>(payloads: &[P]) -> Vec<u8> {
    payloads.iter().flat_map(|p| frame(p.as_ref())).collect()
}

/// Split `bytes` into consecutive chunks ending at each of `cuts`.
///
/// Cut points outside the input are ignored and duplicates collapse; empty
/// chunks are never produced.
///
/// ```
/// use framelink_testing::split_at;
///
/// assert_eq!(split_at(b"abcdef", &[2, 3]), vec![b"ab".to_vec(), b"c".to_vec(), b"def".to_vec()]);
/// ```
#[must_use]
pub fn split_at(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = cuts
        .iter()
        .map(|&c| c.min(bytes.len()))
        .filter(|&c| c > 0 && c < bytes.len())
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::with_capacity(points.len() + 1);
    let mut start = 0;
    for point in points.into_iter().chain(std::iter::once(bytes.len())) {
        if point > start {
            chunks.push(bytes[start..point].to_vec());
            start = point;
        }
    }
    chunks
}
