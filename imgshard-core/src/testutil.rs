/// Minimal PNG: signature plus an IHDR chunk, padded with `seed` so that
/// files of the same size still differ in content.
pub fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let mut v = Vec::with_capacity(64);
    v.extend_from_slice(b"\x89PNG\r\n\x1a\n");
    v.extend_from_slice(&13u32.to_be_bytes());
    v.extend_from_slice(b"IHDR");
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&height.to_be_bytes());
    v.extend_from_slice(&[8, 2, 0, 0, 0]);
    v.extend_from_slice(&[0, 0, 0, 0]);
    v.extend(std::iter::repeat_n(seed, 32));
    v
}
