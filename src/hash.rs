//! Stable 32-bit string hash.
//!
//! Gateways want a numeric `notify_id`, and the same notification id must
//! always map to the same number so re-sends replace rather than stack on
//! the device.

/// Java-style `String.hashCode` over UTF-16 code units, wrapping on overflow.
pub fn hash_str(key: &str) -> i32 {
    key.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_hashes_to_zero() {
        assert_eq!(hash_str(""), 0);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(hash_str("a"), 97);
        assert_eq!(hash_str("ab"), 97 * 31 + 98);
        // Both overflow during accumulation.
        assert_eq!(hash_str("hello world"), 1794106052);
        assert_eq!(hash_str("polygenelubricants"), i32::MIN);
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_str("notification-42"), hash_str("notification-42"));
        assert_ne!(hash_str("notification-42"), hash_str("notification-43"));
    }
}
