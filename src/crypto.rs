use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    HmacSha256::new_from_slice(secret).expect("can init with secret key")
}

pub fn get_digest(secret: &[u8], val: &[u8]) -> Vec<u8> {
    let mut mac = mac(secret);
    mac.update(val);

    mac.finalize().into_bytes().to_vec()
}

pub fn is_valid(secret: &[u8], val: &[u8], digest: &[u8]) -> bool {
    let mut mac = mac(secret);
    mac.update(val);

    mac.verify_slice(digest).is_ok()
}
