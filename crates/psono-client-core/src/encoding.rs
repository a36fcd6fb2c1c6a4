//! Hex encoding at the wire boundary.
//!
//! Every binary value crosses the boundary as lowercase hex. Decoding accepts
//! either case.

use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// Encode bytes as lowercase hex.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Decode a hex string of any length.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Decode a hex string into a fixed-width array.
///
/// The intermediate buffer is wiped, so this is safe to use for key material.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = Zeroizing::new(decode(s)?);
    if bytes.len() != N {
        return Err(CoreError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_lowercase() {
        assert_eq!(encode([0xAB, 0xCD, 0x01]), "abcd01");
    }

    #[test]
    fn test_decode_accepts_uppercase() {
        assert_eq!(decode("ABCD01").unwrap(), vec![0xAB, 0xCD, 0x01]);
    }

    #[test]
    fn test_decode_fixed_rejects_wrong_width() {
        let err = decode_fixed::<4>("aabbcc").unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidLength {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("zz"), Err(CoreError::DecodingError(_))));
        assert!(matches!(decode("abc"), Err(CoreError::DecodingError(_))));
    }
}
