/// Account identifier validation
///
/// Accepts `0x`-prefixed 20-byte hex. All-lowercase and all-uppercase forms
/// are accepted as-is; mixed case must carry a valid EIP-55 checksum.

use std::str::FromStr;

use ethers::types::Address;
use ethers::utils::to_checksum;

use crate::{TypesError, TypesResult};

/// Parse and validate an account identifier.
pub fn parse_address(input: &str) -> TypesResult<Address> {
    let invalid = || TypesError::InvalidAddress(input.to_string());

    let hex = input.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let address = Address::from_str(hex).map_err(|_| invalid())?;

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None) != input {
        return Err(invalid());
    }

    Ok(address)
}

/// Whether `input` is a valid account identifier.
pub fn is_address(input: &str) -> bool {
    parse_address(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_accepts_checksummed_and_single_case() {
        assert!(is_address(CHECKSUMMED));
        assert!(is_address(&CHECKSUMMED.to_lowercase()));
        assert!(is_address(&format!("0x{}", CHECKSUMMED[2..].to_uppercase())));
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        assert!(!is_address(""));
        assert!(!is_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!is_address("0x1234"));
        assert!(!is_address("0xZZAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        // Flipped case on one character breaks the checksum
        assert!(!is_address("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }

    #[test]
    fn test_parse_returns_the_same_account_for_all_casings() {
        let a = parse_address(CHECKSUMMED).unwrap();
        let b = parse_address(&CHECKSUMMED.to_lowercase()).unwrap();
        assert_eq!(a, b);
    }
}
