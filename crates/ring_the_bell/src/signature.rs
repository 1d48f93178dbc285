use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::SignatureError;

type HmacSha1 = Hmac<Sha1>;

/// Check an `X-Hub-Signature: sha1=<hex>` header against the raw request
/// body. Operates on the exact byte slice that will be handed to the feed
/// parser; the comparison runs in constant time via [`Mac::verify_slice`].
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;
    let hex_digest = header
        .strip_prefix("sha1=")
        .ok_or(SignatureError::MalformedHeader)?;
    let claimed = hex::decode(hex_digest).map_err(|_| SignatureError::MalformedHeader)?;

    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&claimed)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produce the header value a hub would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "hunter2";

    #[test]
    fn roundtrip_accepts() {
        let body = b"<feed>anything at all</feed>";
        let header = sign(SECRET, body);
        assert_eq!(verify(SECRET, body, Some(&header)), Ok(()));
    }

    #[test]
    fn flipped_body_bit_rejects() {
        let body = b"<feed>anything at all</feed>".to_vec();
        let header = sign(SECRET, &body);

        for index in 0..body.len() {
            let mut tampered = body.clone();
            tampered[index] ^= 0x01;
            assert_eq!(
                verify(SECRET, &tampered, Some(&header)),
                Err(SignatureError::Mismatch),
            );
        }
    }

    #[test]
    fn flipped_signature_nibble_rejects() {
        let body = b"<feed>anything at all</feed>";
        let mut header = sign(SECRET, body);

        // Flip the last hex nibble.
        let last = header.pop().unwrap();
        header.push(if last == '0' { '1' } else { '0' });

        assert_eq!(
            verify(SECRET, body, Some(&header)),
            Err(SignatureError::Mismatch),
        );
    }

    #[test]
    fn missing_header_rejects() {
        assert_eq!(
            verify(SECRET, b"body", None),
            Err(SignatureError::MissingHeader),
        );
    }

    #[test]
    fn wrong_prefix_rejects() {
        let digest = sign(SECRET, b"body");
        let sha256_style = digest.replace("sha1=", "sha256=");
        assert_eq!(
            verify(SECRET, b"body", Some(&sha256_style)),
            Err(SignatureError::MalformedHeader),
        );
    }

    #[test]
    fn wrong_secret_rejects() {
        let header = sign(SECRET, b"body");
        assert_eq!(
            verify("not-hunter2", b"body", Some(&header)),
            Err(SignatureError::Mismatch),
        );
    }
}
