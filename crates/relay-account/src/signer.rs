//! EIP-712 signing and recovery for forward requests.
//!
//! Signing never touches the network. The identity only sees the final
//! digest inputs (domain and request) and returns a 65-byte signature.

use crate::{AccountError, AccountService};
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolStruct;
use relay_types::{Domain, ForwardRequest, SignedForwardRequest};

/// Digest the forwarder recomputes when it checks a signature.
pub fn signing_hash(domain: &Domain, request: &ForwardRequest) -> B256 {
	request.eip712_signing_hash(&domain.to_eip712())
}

/// Signs `request` under `domain` with `identity`.
///
/// The signature is checked by recovery before it is returned. An identity
/// that does not control `request.from` yields `SigningFailed` instead of a
/// signature the forwarder would reject on-chain.
pub async fn sign_request(
	domain: &Domain,
	request: ForwardRequest,
	identity: &AccountService,
) -> Result<SignedForwardRequest, AccountError> {
	let signature = identity
		.sign_typed_data(&domain.to_eip712(), &request)
		.await?;

	let signed = SignedForwardRequest::new(request, signature);
	let recovered = recover_signer(domain, &signed)?;
	if recovered != signed.from() {
		return Err(AccountError::SigningFailed(format!(
			"identity {} does not control {}",
			recovered,
			signed.from()
		)));
	}

	tracing::debug!(from = %signed.from(), nonce = %signed.nonce(), "Signed forward request");
	Ok(signed)
}

/// Recovers the address that produced the request's signature.
pub fn recover_signer(
	domain: &Domain,
	signed: &SignedForwardRequest,
) -> Result<Address, AccountError> {
	signed
		.signature
		.recover_address_from_prehash(&signing_hash(domain, &signed.request))
		.map_err(|e| AccountError::SigningFailed(format!("Signature recovery failed: {}", e)))
}

/// Offline equivalent of the forwarder's `verify`.
///
/// True when the signature recovers to `from`, the nonce is the signer's
/// current one and the deadline is strictly in the future.
pub fn verify_locally(
	domain: &Domain,
	signed: &SignedForwardRequest,
	current_nonce: U256,
	now: u64,
) -> bool {
	let signer_matches = recover_signer(domain, signed)
		.map(|signer| signer == signed.from())
		.unwrap_or(false);

	signer_matches && signed.nonce() == current_nonce && now < signed.deadline()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::local::LocalWallet;
	use alloy::primitives::{address, aliases::U48, Bytes};

	const USER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const NOW: u64 = 1_700_000_000;

	fn domain() -> Domain {
		Domain {
			name: "MyForwarder".to_string(),
			version: "1".to_string(),
			chain_id: 31337,
			verifying_contract: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
		}
	}

	fn request() -> ForwardRequest {
		ForwardRequest {
			from: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
			to: address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
			value: U256::ZERO,
			gas: U256::from(50_000u64),
			nonce: U256::ZERO,
			deadline: U48::from(NOW + 3600),
			data: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
		}
	}

	fn identity() -> AccountService {
		AccountService::new(Box::new(LocalWallet::new(USER_KEY).unwrap()))
	}

	#[tokio::test]
	async fn test_sign_and_verify() {
		let signed = sign_request(&domain(), request(), &identity()).await.unwrap();

		assert_eq!(recover_signer(&domain(), &signed).unwrap(), signed.from());
		assert!(verify_locally(&domain(), &signed, U256::ZERO, NOW));
	}

	#[tokio::test]
	async fn test_signing_is_deterministic() {
		let a = sign_request(&domain(), request(), &identity()).await.unwrap();
		let b = sign_request(&domain(), request(), &identity()).await.unwrap();
		assert_eq!(a.signature, b.signature);
	}

	#[tokio::test]
	async fn test_identity_must_control_from() {
		let mut foreign = request();
		foreign.from = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

		let result = sign_request(&domain(), foreign, &identity()).await;
		assert!(matches!(result, Err(AccountError::SigningFailed(_))));
	}

	#[tokio::test]
	async fn test_mutated_fields_do_not_verify() {
		let signed = sign_request(&domain(), request(), &identity()).await.unwrap();

		let mutations: Vec<Box<dyn Fn(&mut ForwardRequest)>> = vec![
			Box::new(|r| r.from = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC")),
			Box::new(|r| r.to = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC")),
			Box::new(|r| r.value = U256::from(1u64)),
			Box::new(|r| r.gas = U256::from(50_001u64)),
			Box::new(|r| r.deadline = U48::from(NOW + 3601)),
			Box::new(|r| r.data = Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbc])),
			Box::new(|r| r.nonce = U256::from(1u64)),
		];

		for mutate in mutations {
			let mut tampered = signed.clone();
			mutate(&mut tampered.request);
			assert!(!verify_locally(&domain(), &tampered, U256::ZERO, NOW));
		}

		// A bumped nonce fails on the signature even when it matches the chain
		let mut renumbered = signed.clone();
		renumbered.request.nonce = U256::from(1u64);
		assert!(!verify_locally(&domain(), &renumbered, U256::from(1u64), NOW));
	}

	#[tokio::test]
	async fn test_deadline_boundary() {
		let signed = sign_request(&domain(), request(), &identity()).await.unwrap();
		let deadline = signed.deadline();

		assert!(!verify_locally(&domain(), &signed, U256::ZERO, deadline));
		assert!(verify_locally(&domain(), &signed, U256::ZERO, deadline - 1));
	}

	#[tokio::test]
	async fn test_domain_isolation() {
		let signed = sign_request(&domain(), request(), &identity()).await.unwrap();

		let mut other = domain();
		other.verifying_contract = address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
		assert!(!verify_locally(&other, &signed, U256::ZERO, NOW));
	}
}
