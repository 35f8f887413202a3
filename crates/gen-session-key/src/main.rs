use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use rand::RngCore;

/// Cookie signing keys need at least 64 bytes.
const KEY_LENGTH: usize = 64;

fn main() {
    let mut key = [0u8; KEY_LENGTH];
    rand::rng().fill_bytes(&mut key);
    let encoded_key = STANDARD_NO_PAD.encode(key);
    println!("Session signing key (Base-64 encoded, {KEY_LENGTH} bytes): {encoded_key}");
}
