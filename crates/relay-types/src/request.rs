//! Forward request types.
//!
//! A [`ForwardRequest`] is the unit of delegated authorization. It is signed
//! under a [`Domain`] that binds the signature to one forwarder deployment on
//! one chain.

use crate::contracts::{ForwardRequest, IERC2771Forwarder::ForwardRequestData};
use alloy::primitives::{Address, Bytes, Signature, U256};
use alloy::sol_types::Eip712Domain;
use std::fmt;

/// EIP-712 domain of a forwarder deployment.
///
/// Always read from the forwarder itself, never assembled from local
/// constants, so a signature can only ever target the contract that
/// reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

impl Domain {
	/// Converts into the alloy domain used for hashing.
	pub fn to_eip712(&self) -> Eip712Domain {
		Eip712Domain::new(
			Some(self.name.clone().into()),
			Some(self.version.clone().into()),
			Some(U256::from(self.chain_id)),
			Some(self.verifying_contract),
			None,
		)
	}
}

impl fmt::Display for Domain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} v{} (chain {}, contract {})",
			self.name, self.version, self.chain_id, self.verifying_contract
		)
	}
}

/// A forward request together with the user's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedForwardRequest {
	pub request: ForwardRequest,
	pub signature: Signature,
}

impl SignedForwardRequest {
	pub fn new(request: ForwardRequest, signature: Signature) -> Self {
		Self { request, signature }
	}

	pub fn from(&self) -> Address {
		self.request.from
	}

	pub fn nonce(&self) -> U256 {
		self.request.nonce
	}

	/// Unix timestamp after which the forwarder rejects the request.
	pub fn deadline(&self) -> u64 {
		self.request.deadline.to::<u64>()
	}

	/// 65-byte `r || s || v` encoding with `v` in {27, 28}.
	pub fn signature_bytes(&self) -> Bytes {
		Bytes::from(self.signature.as_bytes().to_vec())
	}

	/// Builds the struct the forwarder's `verify` and `execute` accept.
	///
	/// The nonce is dropped here. The forwarder supplies the signer's
	/// current nonce when it recomputes the digest.
	pub fn to_request_data(&self) -> ForwardRequestData {
		ForwardRequestData {
			from: self.request.from,
			to: self.request.to,
			value: self.request.value,
			gas: self.request.gas,
			deadline: self.request.deadline,
			data: self.request.data.clone(),
			signature: self.signature_bytes(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{address, aliases::U48, B256};

	fn sample_request() -> ForwardRequest {
		ForwardRequest {
			from: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
			to: address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
			value: U256::ZERO,
			gas: U256::from(50_000u64),
			nonce: U256::from(3u64),
			deadline: U48::from(1_700_003_600u64),
			data: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
		}
	}

	#[test]
	fn test_request_data_carries_every_field_but_nonce() {
		let signature = Signature::new(U256::from(1u64), U256::from(2u64), true);
		let signed = SignedForwardRequest::new(sample_request(), signature);

		let data = signed.to_request_data();
		assert_eq!(data.from, signed.request.from);
		assert_eq!(data.to, signed.request.to);
		assert_eq!(data.value, signed.request.value);
		assert_eq!(data.gas, signed.request.gas);
		assert_eq!(data.deadline, signed.request.deadline);
		assert_eq!(data.data, signed.request.data);
		assert_eq!(data.signature.len(), 65);
		assert_eq!(data.signature[64], 28);
		assert_eq!(signed.deadline(), 1_700_003_600);
	}

	#[test]
	fn test_domain_separator_depends_on_verifying_contract() {
		let domain = Domain {
			name: "MyForwarder".to_string(),
			version: "1".to_string(),
			chain_id: 31337,
			verifying_contract: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
		};
		let mut other = domain.clone();
		other.verifying_contract = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");

		let a: B256 = domain.to_eip712().separator();
		let b: B256 = other.to_eip712().separator();
		assert_ne!(a, b);
		assert_eq!(domain.to_eip712().chain_id, Some(U256::from(31337u64)));
	}
}
