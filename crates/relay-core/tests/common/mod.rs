//! In-memory chain with a trusted forwarder and an ERC-2771 token.
//!
//! Transactions are mined instantly, one block each. Contract behaviour is
//! emulated at the calldata level so the relay talks to it exactly as it
//! would to a node.

#![allow(dead_code)]

use alloy::primitives::{address, Address, Bytes, FixedBytes, Log, Signature, B256, U256};
use alloy::sol_types::{SolCall, SolEvent, SolInterface, SolValue};
use async_trait::async_trait;
use relay_account::implementations::local::create_account;
use relay_account::verify_locally;
use relay_config::ConfigLoader;
use relay_core::{RelayBuilder, RelayEngine};
use relay_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use relay_forwarder::ForwarderClient;
use relay_request::{Clock, ManualClock};
use relay_types::{
	Domain, ForwardRequest, IERC2771Forwarder, IRecipient, SignedForwardRequest, Transaction,
	TransactionHash, TransactionReceipt,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHAIN_ID: u64 = 31337;
pub const FORWARDER: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
pub const RECIPIENT: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const RELAYER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const USER1: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const USER2: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

pub const NOW: u64 = 1_700_000_000;
pub const GAS_PRICE: u128 = 1_000_000_000;

const BASE_GAS: u64 = 21_000;
const FORWARDER_OVERHEAD: u64 = 30_000;

/// One whole token with 18 decimals.
pub fn tokens(amount: u64) -> U256 {
	U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn ether(amount: u64) -> U256 {
	tokens(amount)
}

const CONFIG: &str = r#"
[relay]
name = "simulated"

[contracts]
forwarder = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
recipient = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"

[delivery]
provider = "simulated"
[delivery.config]

[accounts.relayer]
provider = "local"
[accounts.relayer.config]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[accounts.user1]
provider = "local"
[accounts.user1.config]
private_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"

[accounts.user2]
provider = "local"
[accounts.user2.config]
private_key = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a"
"#;

struct ChainState {
	block: u64,
	native: HashMap<Address, U256>,
	tokens: HashMap<Address, U256>,
	nonces: HashMap<Address, U256>,
	receipts: HashMap<TransactionHash, TransactionReceipt>,
	/// Gas the recipient's `transfer` consumes.
	transfer_gas: u64,
	/// Revert the whole `execute` when the inner call fails.
	revert_on_inner_failure: bool,
	/// Refuse broadcasts as an unreachable node would.
	offline: bool,
	/// Mine transactions but never report them confirmed.
	stalled: bool,
	/// Name reported by `eip712Domain()` when it differs from the signing domain.
	reported_name: Option<String>,
}

/// Handle to the shared chain. Clones see the same state.
#[derive(Clone)]
pub struct SimulatedChain {
	state: Arc<Mutex<ChainState>>,
	clock: Arc<ManualClock>,
}

impl SimulatedChain {
	pub fn new(clock: Arc<ManualClock>) -> Self {
		let mut native = HashMap::new();
		native.insert(RELAYER, ether(10_000));
		native.insert(USER1, ether(1));

		Self {
			state: Arc::new(Mutex::new(ChainState {
				block: 1,
				native,
				tokens: HashMap::new(),
				nonces: HashMap::new(),
				receipts: HashMap::new(),
				transfer_gas: 35_000,
				revert_on_inner_failure: false,
				offline: false,
				stalled: false,
				reported_name: None,
			})),
			clock,
		}
	}

	pub fn domain() -> Domain {
		Domain {
			name: "MyForwarder".to_string(),
			version: "1".to_string(),
			chain_id: CHAIN_ID,
			verifying_contract: FORWARDER,
		}
	}

	pub fn set_transfer_gas(&self, gas: u64) {
		self.state.lock().unwrap().transfer_gas = gas;
	}

	pub fn set_revert_on_inner_failure(&self, revert: bool) {
		self.state.lock().unwrap().revert_on_inner_failure = revert;
	}

	pub fn set_offline(&self, offline: bool) {
		self.state.lock().unwrap().offline = offline;
	}

	/// Transactions still execute but confirmation waits time out.
	pub fn set_stalled(&self, stalled: bool) {
		self.state.lock().unwrap().stalled = stalled;
	}

	/// Makes `eip712Domain()` report a name the forwarder does not verify against.
	pub fn set_reported_name(&self, name: &str) {
		self.state.lock().unwrap().reported_name = Some(name.to_string());
	}

	pub fn nonce_of(&self, address: Address) -> U256 {
		self.state.lock().unwrap().nonce(address)
	}

	pub fn token_balance_of(&self, address: Address) -> U256 {
		self.state.lock().unwrap().token(address)
	}

	pub fn native_balance_of(&self, address: Address) -> U256 {
		self.state.lock().unwrap().native(address)
	}

	fn verifies(&self, state: &ChainState, data: &IERC2771Forwarder::ForwardRequestData) -> bool {
		let Ok(signature) = Signature::try_from(&data.signature[..]) else {
			return false;
		};
		let nonce = state.nonce(data.from);
		let signed = SignedForwardRequest::new(
			ForwardRequest {
				from: data.from,
				to: data.to,
				value: data.value,
				gas: data.gas,
				nonce,
				deadline: data.deadline,
				data: data.data.clone(),
			},
			signature,
		);

		verify_locally(&Self::domain(), &signed, nonce, self.clock.now())
	}

	fn domain_response(state: &ChainState) -> Bytes {
		let domain = Self::domain();
		(
			FixedBytes::<1>::from([0x0f]),
			state.reported_name.clone().unwrap_or(domain.name),
			domain.version,
			U256::from(CHAIN_ID),
			FORWARDER,
			B256::ZERO,
			Vec::<U256>::new(),
		)
			.abi_encode_params()
			.into()
	}

	/// Runs `execute` and returns whether the transaction succeeded, the
	/// gas it used and its logs.
	fn execute(
		&self,
		state: &mut ChainState,
		request: IERC2771Forwarder::ForwardRequestData,
		msg_value: U256,
	) -> (bool, u64, Vec<Log>) {
		if msg_value != request.value || !self.verifies(state, &request) {
			return (false, BASE_GAS + FORWARDER_OVERHEAD, vec![]);
		}

		let nonce = state.nonce(request.from);
		state.nonces.insert(request.from, nonce + U256::from(1u64));

		let gas_limit = u64::try_from(request.gas).unwrap_or(u64::MAX);
		let inner = if request.to == RECIPIENT {
			state.recipient_call(request.from, &request.data, gas_limit)
		} else {
			Ok((0, vec![]))
		};

		let (success, inner_gas, mut logs) = match inner {
			Ok((gas, logs)) => (true, gas, logs),
			Err(gas) => (false, gas, vec![]),
		};

		if !success && state.revert_on_inner_failure {
			state.nonces.insert(request.from, nonce);
			return (false, BASE_GAS + FORWARDER_OVERHEAD + inner_gas, vec![]);
		}

		logs.push(Log {
			address: FORWARDER,
			data: IERC2771Forwarder::ExecutedForwardRequest {
				signer: request.from,
				nonce,
				success,
			}
			.encode_log_data(),
		});

		(true, BASE_GAS + FORWARDER_OVERHEAD + inner_gas, logs)
	}
}

impl ChainState {
	fn nonce(&self, address: Address) -> U256 {
		self.nonces.get(&address).copied().unwrap_or_default()
	}

	fn token(&self, address: Address) -> U256 {
		self.tokens.get(&address).copied().unwrap_or_default()
	}

	fn native(&self, address: Address) -> U256 {
		self.native.get(&address).copied().unwrap_or_default()
	}

	/// Executes recipient calldata for `sender`. `Err` carries the gas burnt
	/// by a failed call.
	fn recipient_call(
		&mut self,
		sender: Address,
		data: &[u8],
		gas_limit: u64,
	) -> Result<(u64, Vec<Log>), u64> {
		let call = IRecipient::IRecipientCalls::abi_decode(data).map_err(|_| 0u64)?;

		match call {
			IRecipient::IRecipientCalls::transfer(transfer) => {
				if gas_limit < self.transfer_gas {
					return Err(gas_limit);
				}
				let balance = self.token(sender);
				if balance < transfer.value {
					return Err(self.transfer_gas);
				}
				self.tokens.insert(sender, balance - transfer.value);
				let received = self.token(transfer.to);
				self.tokens.insert(transfer.to, received + transfer.value);

				Ok((self.transfer_gas, vec![transfer_log(sender, transfer.to, transfer.value)]))
			}
			IRecipient::IRecipientCalls::mint(mint) => {
				if sender != RELAYER {
					return Err(5_000);
				}
				let balance = self.token(mint.to);
				self.tokens.insert(mint.to, balance + mint.amount);

				Ok((50_000, vec![transfer_log(Address::ZERO, mint.to, mint.amount)]))
			}
			IRecipient::IRecipientCalls::balanceOf(_) => Ok((3_000, vec![])),
		}
	}
}

fn transfer_log(from: Address, to: Address, value: U256) -> Log {
	Log {
		address: RECIPIENT,
		data: IRecipient::Transfer { from, to, value }.encode_log_data(),
	}
}

#[async_trait]
impl DeliveryInterface for SimulatedChain {
	fn address(&self) -> Address {
		RELAYER
	}

	fn chain_id(&self) -> u64 {
		CHAIN_ID
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		let state = self.state.lock().unwrap();

		if to == FORWARDER {
			let call = IERC2771Forwarder::IERC2771ForwarderCalls::abi_decode(&data)
				.map_err(|e| DeliveryError::CallReverted(e.to_string()))?;
			return match call {
				IERC2771Forwarder::IERC2771ForwarderCalls::eip712Domain(_) => {
					Ok(Self::domain_response(&state))
				}
				IERC2771Forwarder::IERC2771ForwarderCalls::nonces(nonces) => {
					Ok((state.nonce(nonces.owner),).abi_encode_params().into())
				}
				IERC2771Forwarder::IERC2771ForwarderCalls::verify(verify) => {
					Ok((self.verifies(&state, &verify.request),)
						.abi_encode_params()
						.into())
				}
				IERC2771Forwarder::IERC2771ForwarderCalls::execute(_) => Ok(Bytes::new()),
			};
		}

		if to == RECIPIENT {
			let call = IRecipient::IRecipientCalls::abi_decode(&data)
				.map_err(|e| DeliveryError::CallReverted(e.to_string()))?;
			return match call {
				IRecipient::IRecipientCalls::balanceOf(query) => {
					Ok((state.token(query.account),).abi_encode_params().into())
				}
				_ => Err(DeliveryError::CallReverted(
					"state-changing call in read-only context".to_string(),
				)),
			};
		}

		Err(DeliveryError::CallReverted(format!("no code at {}", to)))
	}

	async fn estimate_gas(&self, _tx: &Transaction) -> Result<u64, DeliveryError> {
		Ok(200_000)
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		Ok(GAS_PRICE)
	}

	async fn balance(&self, address: Address) -> Result<U256, DeliveryError> {
		Ok(self.state.lock().unwrap().native(address))
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let mut state = self.state.lock().unwrap();
		if state.offline {
			return Err(DeliveryError::Network("connection refused".to_string()));
		}

		let relayer_balance = state.native(RELAYER);
		if relayer_balance < tx.value {
			return Err(DeliveryError::Network("insufficient funds".to_string()));
		}

		state.block += 1;
		let block_number = state.block;
		let hash = TransactionHash(B256::from(U256::from(block_number).to_be_bytes::<32>()));

		let (success, gas_used, logs) = if tx.to == FORWARDER {
			match IERC2771Forwarder::executeCall::abi_decode(&tx.data) {
				Ok(call) => self.execute(&mut state, call.request, tx.value),
				Err(_) => (false, BASE_GAS, vec![]),
			}
		} else if tx.to == RECIPIENT {
			match state.recipient_call(RELAYER, &tx.data, u64::MAX) {
				Ok((gas, logs)) => (true, BASE_GAS + gas, logs),
				Err(gas) => (false, BASE_GAS + gas, vec![]),
			}
		} else {
			(true, BASE_GAS, vec![])
		};

		if success && !tx.value.is_zero() {
			let received = state.native(tx.to);
			state.native.insert(tx.to, received + tx.value);
			state.native.insert(RELAYER, relayer_balance - tx.value);
		}

		let price = tx.gas_price.or(tx.max_fee_per_gas).unwrap_or(GAS_PRICE);
		let fee = U256::from(gas_used) * U256::from(price);
		let remaining = state.native(RELAYER).saturating_sub(fee);
		state.native.insert(RELAYER, remaining);

		state.receipts.insert(
			hash,
			TransactionReceipt {
				hash,
				block_number,
				success,
				gas_used,
				logs,
			},
		);

		Ok(hash)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		if self.state.lock().unwrap().stalled {
			return Err(DeliveryError::Timeout {
				confirmations,
				seconds: 300,
			});
		}
		self.get_receipt(hash).await
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.state
			.lock()
			.unwrap()
			.receipts
			.get(hash)
			.cloned()
			.ok_or_else(|| DeliveryError::Network("Transaction not found".to_string()))
	}
}

pub struct TestRelay {
	pub engine: RelayEngine,
	pub chain: SimulatedChain,
	pub clock: Arc<ManualClock>,
}

impl TestRelay {
	/// Forwarder client sharing the engine's chain, for driving the forwarder directly.
	pub fn forwarder(&self) -> ForwarderClient {
		let delivery = DeliveryService::new(Box::new(self.chain.clone()), 1, Duration::from_secs(5));
		ForwarderClient::new(FORWARDER, Arc::new(delivery))
	}
}

pub fn setup() -> TestRelay {
	setup_with(CONFIG)
}

pub fn setup_with(config: &str) -> TestRelay {
	let clock = Arc::new(ManualClock::new(NOW));
	let chain = SimulatedChain::new(clock.clone());

	let config = ConfigLoader::new()
		.with_env_prefix("RELAY_SIMULATED_")
		.parse(config)
		.unwrap();

	let delivery_chain = chain.clone();
	let engine = RelayBuilder::new(config)
		.with_delivery_factory("simulated", move |_config| {
			Ok(Box::new(delivery_chain.clone()) as Box<dyn DeliveryInterface>)
		})
		.with_account_factory("local", create_account)
		.with_clock(clock.clone())
		.build()
		.unwrap();

	TestRelay {
		engine,
		chain,
		clock,
	}
}

/// Base configuration with `extra` appended to the `[relay]` table.
pub fn config_with_relay_settings(extra: &str) -> String {
	CONFIG.replace(
		"name = \"simulated\"",
		&format!("name = \"simulated\"\n{}", extra),
	)
}
