//! Solidity definitions for the contracts the relay talks to.
//!
//! The relay only needs a narrow slice of each contract:
//! - [`ForwardRequest`] is the EIP-712 struct users sign
//! - [`IERC2771Forwarder`] is the trusted forwarder that verifies and executes requests
//! - [`IRecipient`] is the ERC-2771 aware token that receives forwarded calls

use alloy::sol;

sol! {
	/// Typed-data struct signed by the user.
	///
	/// Field order and types define the EIP-712 type string
	/// `ForwardRequest(address from,address to,uint256 value,uint256 gas,uint256 nonce,uint48 deadline,bytes data)`
	/// and must match the forwarder contract exactly.
	#[derive(Debug, PartialEq, Eq)]
	struct ForwardRequest {
		address from;
		address to;
		uint256 value;
		uint256 gas;
		uint256 nonce;
		uint48 deadline;
		bytes data;
	}
}

sol! {
	/// Trusted forwarder interface (OpenZeppelin `ERC2771Forwarder`).
	///
	/// The on-chain request carries no nonce. The forwarder checks the
	/// signature against the signer's current nonce.
	#[allow(missing_docs)]
	#[derive(Debug, PartialEq, Eq)]
	interface IERC2771Forwarder {
		struct ForwardRequestData {
			address from;
			address to;
			uint256 value;
			uint256 gas;
			uint48 deadline;
			bytes data;
			bytes signature;
		}

		event ExecutedForwardRequest(address indexed signer, uint256 nonce, bool success);

		function eip712Domain() external view returns (
			bytes1 fields,
			string name,
			string version,
			uint256 chainId,
			address verifyingContract,
			bytes32 salt,
			uint256[] extensions
		);
		function nonces(address owner) external view returns (uint256);
		function verify(ForwardRequestData request) external view returns (bool);
		function execute(ForwardRequestData request) external payable;
	}
}

sol! {
	/// Token recipient that trusts the forwarder for `_msgSender()`.
	#[allow(missing_docs)]
	#[derive(Debug, PartialEq, Eq)]
	interface IRecipient {
		event Transfer(address indexed from, address indexed to, uint256 value);

		function transfer(address to, uint256 value) external returns (bool);
		function mint(address to, uint256 amount) external;
		function balanceOf(address account) external view returns (uint256);
	}
}

/// ERC-5267 `fields` bits for name, version, chainId and verifyingContract.
pub const REQUIRED_DOMAIN_FIELDS: u8 = 0x0f;
