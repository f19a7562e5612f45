//! Recipient calls and token amounts.

use crate::RequestError;
use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use relay_types::IRecipient;

/// Call to perform on the recipient contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientCall {
	/// `transfer(to, amount)` executed as the signer.
	Transfer { to: Address, amount: U256 },
	/// `mint(to, amount)`.
	Mint { to: Address, amount: U256 },
	/// Pre-encoded calldata.
	Raw(Bytes),
}

impl RecipientCall {
	/// ABI-encodes the call, rejecting zero token amounts.
	pub fn encode(&self) -> Result<Bytes, RequestError> {
		match self {
			Self::Transfer { to, amount } => {
				ensure_positive(*amount)?;
				Ok(IRecipient::transferCall {
					to: *to,
					value: *amount,
				}
				.abi_encode()
				.into())
			}
			Self::Mint { to, amount } => {
				ensure_positive(*amount)?;
				Ok(IRecipient::mintCall {
					to: *to,
					amount: *amount,
				}
				.abi_encode()
				.into())
			}
			Self::Raw(data) => Ok(data.clone()),
		}
	}
}

fn ensure_positive(amount: U256) -> Result<(), RequestError> {
	if amount.is_zero() {
		return Err(RequestError::InvalidAmount(
			"amount must be greater than zero".to_string(),
		));
	}
	Ok(())
}

/// Parses a human amount such as `"100"` or `"0.5"` into base units.
///
/// Zero, negative and malformed amounts are rejected.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256, RequestError> {
	let parsed = parse_units(input.trim(), decimals)
		.map_err(|e| RequestError::InvalidAmount(format!("'{}': {}", input, e)))?;

	if parsed.is_negative() {
		return Err(RequestError::InvalidAmount(format!(
			"'{}' is negative",
			input
		)));
	}

	let amount = parsed.get_absolute();
	ensure_positive(amount)?;
	Ok(amount)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::address;

	#[test]
	fn test_parse_amount() {
		let wei = U256::from(10u64).pow(U256::from(18u64));
		assert_eq!(parse_amount("100", 18).unwrap(), U256::from(100u64) * wei);
		assert_eq!(parse_amount("0.5", 18).unwrap(), wei / U256::from(2u64));
		assert_eq!(parse_amount("7", 0).unwrap(), U256::from(7u64));
	}

	#[test]
	fn test_parse_amount_rejects_non_positive() {
		for input in ["0", "0.0", "-1", "abc", ""] {
			assert!(
				matches!(parse_amount(input, 18), Err(RequestError::InvalidAmount(_))),
				"{} should be rejected",
				input
			);
		}
	}

	#[test]
	fn test_transfer_encoding() {
		let to = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
		let data = RecipientCall::Transfer {
			to,
			amount: U256::from(100u64),
		}
		.encode()
		.unwrap();

		// transfer(address,uint256)
		assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
		let decoded = IRecipient::transferCall::abi_decode(&data).unwrap();
		assert_eq!(decoded.to, to);
		assert_eq!(decoded.value, U256::from(100u64));
	}

	#[test]
	fn test_zero_amount_rejected() {
		let to = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
		let call = RecipientCall::Mint {
			to,
			amount: U256::ZERO,
		};
		assert!(matches!(call.encode(), Err(RequestError::InvalidAmount(_))));

		let raw = RecipientCall::Raw(Bytes::from(vec![1, 2]));
		assert_eq!(raw.encode().unwrap(), Bytes::from(vec![1, 2]));
	}
}
