//! Display helpers shared across the relay crates.

use alloy::primitives::utils::format_units;
use alloy::primitives::U256;

/// Truncate a hash or long identifier for display purposes.
///
/// Shows the first 6 and last 4 characters with an ellipsis in between.
/// Strings of 12 characters or fewer are returned unchanged.
pub fn truncate_hash(hash: &str) -> String {
	if hash.len() <= 12 {
		hash.to_string()
	} else {
		format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
	}
}

/// Formats a base-unit amount with the given number of decimals.
///
/// Falls back to the raw integer when the decimals are out of range.
pub fn format_amount(amount: U256, decimals: u8) -> String {
	format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_hash() {
		let hash = "0xa096c418fd1192ba7f5b506beea682a633f9ab82911fa3d7a249b8d80889a0b4";
		assert_eq!(truncate_hash(hash), "0xa096...a0b4");

		assert_eq!(truncate_hash("0x12345"), "0x12345");
		assert_eq!(truncate_hash("0x1234567890"), "0x1234567890");
	}

	#[test]
	fn test_format_amount() {
		let hundred = U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64));
		assert_eq!(format_amount(hundred, 18), "100.000000000000000000");
		assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.500000");
	}
}
