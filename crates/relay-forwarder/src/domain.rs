//! EIP-712 domain resolution.
//!
//! The domain is read from the forwarder's ERC-5267 `eip712Domain()` on every
//! call and checked against the contract that was queried and the chain the
//! relayer submits to.

use crate::ForwarderError;
use alloy::primitives::Address;
use relay_types::{Domain, IERC2771Forwarder, REQUIRED_DOMAIN_FIELDS};

/// Validates an `eip712Domain()` response.
pub(crate) fn domain_from_returns(
	returns: IERC2771Forwarder::eip712DomainReturn,
	forwarder: Address,
	chain_id: u64,
) -> Result<Domain, ForwarderError> {
	let fields = returns.fields[0];
	if fields & REQUIRED_DOMAIN_FIELDS != REQUIRED_DOMAIN_FIELDS {
		return Err(ForwarderError::DomainUnavailable(format!(
			"domain fields {:#04x} lack name, version, chainId or verifyingContract",
			fields
		)));
	}

	if returns.verifyingContract != forwarder {
		return Err(ForwarderError::DomainUnavailable(format!(
			"verifying contract {} does not match forwarder {}",
			returns.verifyingContract, forwarder
		)));
	}

	let reported_chain = u64::try_from(returns.chainId).map_err(|_| {
		ForwarderError::DomainUnavailable(format!("chain id {} out of range", returns.chainId))
	})?;
	if reported_chain != chain_id {
		return Err(ForwarderError::DomainUnavailable(format!(
			"forwarder reports chain {} but the relayer is on chain {}",
			reported_chain, chain_id
		)));
	}

	if returns.name.is_empty() {
		return Err(ForwarderError::DomainUnavailable(
			"forwarder reports an empty domain name".to_string(),
		));
	}

	Ok(Domain {
		name: returns.name,
		version: returns.version,
		chain_id: reported_chain,
		verifying_contract: returns.verifyingContract,
	})
}
