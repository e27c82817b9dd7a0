//! Watch-only address derivation (C2).
//!
//! Pure, stateless: `derive(xpub, prefix, index) -> address`. The xpub is
//! assumed already positioned at the Cosmos-standard account path
//! (`m/44'/118'/0'/0`); this module only performs the final non-hardened
//! child-key derivation (BIP32 `CKDpub`) plus the hash160-then-bech32
//! address encoding.

use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::PrimeField;
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

type HmacSha512 = Hmac<Sha512>;

const XPUB_PAYLOAD_LEN: usize = 78;
/// Non-hardened child indices are below 2^31; the top bit is reserved to
/// flag hardened derivation, which this module never performs.
const HARDENED_BIT: u32 = 0x8000_0000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeriverError {
    #[error("xpub is not configured")]
    MissingXpub,
    #[error("bech32 prefix is not configured")]
    MissingPrefix,
    #[error("malformed xpub: {0}")]
    MalformedXpub(String),
    #[error("derivation index {0} is hardened, which is not supported for a watch-only xpub")]
    HardenedIndex(u32),
    #[error("derived child key is invalid (negligible-probability curve edge case)")]
    InvalidChildKey,
    #[error("bech32 encoding failed: {0}")]
    Bech32(String),
}

struct ExtendedPubKey {
    chain_code: [u8; 32],
    public_key: [u8; 33],
}

/// Decodes a base58check-encoded extended public key (xpub) into its chain
/// code and compressed public key, per BIP32's 78-byte serialization:
/// `version(4) || depth(1) || parent_fingerprint(4) || child_number(4) ||
/// chain_code(32) || public_key(33)`.
fn parse_xpub(xpub: &str) -> Result<ExtendedPubKey, DeriverError> {
    let payload = bs58::decode(xpub)
        .with_check(None)
        .into_vec()
        .map_err(|e| DeriverError::MalformedXpub(e.to_string()))?;
    if payload.len() != XPUB_PAYLOAD_LEN {
        return Err(DeriverError::MalformedXpub(format!(
            "expected {XPUB_PAYLOAD_LEN}-byte payload, got {}",
            payload.len()
        )));
    }
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&payload[13..45]);
    let mut public_key = [0u8; 33];
    public_key.copy_from_slice(&payload[45..78]);
    Ok(ExtendedPubKey { chain_code, public_key })
}

/// BIP32 `CKDpub`: derives the non-hardened child public key at `index`.
fn derive_child_pubkey(parent: &ExtendedPubKey, index: u32) -> Result<[u8; 33], DeriverError> {
    if index & HARDENED_BIT != 0 {
        return Err(DeriverError::HardenedIndex(index));
    }

    let parent_encoded = EncodedPoint::from_bytes(parent.public_key)
        .map_err(|e| DeriverError::MalformedXpub(format!("invalid public key: {e}")))?;
    let parent_affine: AffinePoint = Option::from(AffinePoint::from_encoded_point(&parent_encoded))
        .ok_or_else(|| DeriverError::MalformedXpub("public key not on curve".to_string()))?;
    let parent_point = ProjectivePoint::from(parent_affine);

    let mut mac = <HmacSha512 as Mac>::new_from_slice(&parent.chain_code)
        .expect("HMAC accepts any key length");
    mac.update(&parent.public_key);
    mac.update(&index.to_be_bytes());
    let i = mac.finalize().into_bytes();

    let il_bytes = FieldBytes::clone_from_slice(&i[0..32]);
    let il_scalar: Scalar =
        Option::from(Scalar::from_repr(il_bytes)).ok_or(DeriverError::InvalidChildKey)?;

    let child_point = ProjectivePoint::GENERATOR * il_scalar + parent_point;
    let child_affine = child_point.to_affine();
    let encoded = child_affine.to_encoded_point(true);
    let bytes = encoded.as_bytes();
    if bytes.len() != 33 {
        return Err(DeriverError::InvalidChildKey);
    }
    let mut out = [0u8; 33];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// `SHA-256` then `RIPEMD-160` of a compressed public key — the standard
/// hash160 used to shorten a public key into an address payload.
fn hash160(compressed_pubkey: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(compressed_pubkey);
    let rip = ripemd::Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&rip);
    out
}

/// Derives the bech32 address for `index` from `xpub`, per spec.md §4.1.
pub fn derive(xpub: &str, prefix: &str, index: u32) -> Result<String, DeriverError> {
    if xpub.is_empty() {
        return Err(DeriverError::MissingXpub);
    }
    if prefix.is_empty() {
        return Err(DeriverError::MissingPrefix);
    }

    let parent = parse_xpub(xpub)?;
    let child_pubkey = derive_child_pubkey(&parent, index)?;
    let hash = hash160(&child_pubkey);

    let converted: Vec<bech32::u5> = bech32::convert_bits(&hash, 8, 5, true)
        .map_err(|e| DeriverError::Bech32(e.to_string()))?
        .into_iter()
        .map(|b| bech32::u5::try_from_u8(b).expect("convert_bits output fits in 5 bits"))
        .collect();
    bech32::encode(prefix, converted, bech32::Variant::Bech32)
        .map_err(|e| DeriverError::Bech32(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_xpub() {
        assert_eq!(derive("", "dora", 0), Err(DeriverError::MissingXpub));
    }

    #[test]
    fn rejects_empty_prefix() {
        assert_eq!(
            derive("xpub000000000000000000000000000000000000000000000000000000000000000000000000000000", "", 0),
            Err(DeriverError::MissingPrefix)
        );
    }

    #[test]
    fn rejects_malformed_xpub() {
        let err = derive("not-a-valid-xpub", "dora", 0);
        assert!(matches!(err, Err(DeriverError::MalformedXpub(_))));
    }

    #[test]
    fn rejects_hardened_index() {
        // A syntactically well-formed (but cryptographically arbitrary)
        // 78-byte payload is enough to reach the hardened-index check,
        // which happens before any curve math.
        let mut payload = vec![0u8; 78];
        payload[45] = 0x02; // compressed-key prefix byte, content otherwise unused here
        let xpub = bs58::encode(&payload).with_check().into_string();
        let err = derive(&xpub, "dora", 0x8000_0000);
        assert_eq!(err, Err(DeriverError::HardenedIndex(0x8000_0000)));
    }

    #[test]
    fn same_index_is_deterministic() {
        // Build a payload with a real generator-point public key so the
        // curve math succeeds, then confirm determinism and index-sensitivity.
        let generator = ProjectivePoint::GENERATOR.to_affine();
        let encoded = generator.to_encoded_point(true);
        let mut payload = vec![0u8; 45];
        payload.extend_from_slice(encoded.as_bytes());
        let xpub = bs58::encode(&payload).with_check().into_string();

        let a1 = derive(&xpub, "dora", 7).unwrap();
        let a2 = derive(&xpub, "dora", 7).unwrap();
        let a3 = derive(&xpub, "dora", 8).unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, a3);
        assert!(a1.starts_with("dora1"));
    }
}
