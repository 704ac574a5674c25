use rand::RngExt;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Generate 8 random bytes for an opaque identifier.
pub fn generate_id_bytes() -> [u8; 8] {
    let mut bytes = [0u8; 8];
    let mut rng = rand::rng();
    rng.fill(&mut bytes);
    bytes
}

/// Generate a random relationship id in the form `R0123456789abcdef`.
///
/// The leading letter keeps the value a valid `xsd:ID`.
pub fn generate_rel_id() -> String {
    let bytes = generate_id_bytes();
    let mut out = String::with_capacity(1 + bytes.len() * 2);
    out.push('R');
    for b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Generate a random relationship id for which `taken` returns false.
pub fn generate_unique_rel_id<F>(mut taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    loop {
        let id = generate_rel_id();
        if !taken(&id) {
            return id;
        }
    }
}
