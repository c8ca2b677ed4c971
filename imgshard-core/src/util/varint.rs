use std::io::{self, Read};

pub fn put_uvarint(out: &mut Vec<u8>, mut x: u64) {
    while x >= 0x80 {
        out.push((x as u8) | 0x80);
        x >>= 7;
    }
    out.push(x as u8);
}

/// `Ok(None)` on a clean EOF before the first byte.
pub fn get_uvarint<R: Read>(r: &mut R) -> io::Result<Option<u64>> {
    let mut x: u64 = 0;
    let mut s: u32 = 0;
    for i in 0..10 {
        let mut b = [0u8; 1];
        if r.read(&mut b)? == 0 {
            if i == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated varint",
            ));
        }
        let byte = b[0];
        if byte < 0x80 {
            x |= (byte as u64) << s;
            return Ok(Some(x));
        }
        x |= ((byte & 0x7f) as u64) << s;
        s += 7;
    }
    Err(io::Error::new(io::ErrorKind::InvalidData, "varint too long"))
}
