//! Relay orchestration.
//!
//! The engine drives one relay attempt at a time per signer: resolve the
//! domain, build the request, sign it, optionally pre-verify it and have the
//! relayer submit it through the forwarder. Every state change is published
//! on the event bus.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use relay_account::{sign_request, AccountError, AccountInterface, AccountService};
use relay_config::Config;
use relay_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use relay_forwarder::{ForwarderClient, ForwarderError};
use relay_request::{
	parse_amount, Clock, RecipientCall, RequestBuilder, RequestError, RequestSpec, SystemClock,
};
use relay_types::{
	utils::truncate_hash, AttemptEvent, DeliveryEvent, Domain, ExecutionParams, IRecipient,
	RelayEvent, RelayOutcome, RelayStage, RelayState, SignedForwardRequest, Transaction,
	TransactionReceipt,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

pub mod attempt;
pub mod error;
pub mod event_bus;
pub mod locks;

pub use attempt::RelayAttempt;
pub use error::RelayError;
pub use event_bus::EventBus;
pub use locks::{AddressGuard, AddressLocks};

/// Per-attempt overrides of the configured request defaults.
#[derive(Debug, Clone, Default)]
pub struct RelayOptions {
	/// Gas budget of the inner call.
	pub gas: Option<u64>,
	/// Request lifetime in seconds.
	pub ttl_seconds: Option<u64>,
	/// Native value forwarded with the call.
	pub value: U256,
	/// Overrides the configured pre-verification switch.
	pub pre_verify: Option<bool>,
}

/// What a finished attempt produced.
#[derive(Debug, Clone)]
pub struct RelayReport {
	pub attempt_id: Uuid,
	pub request: SignedForwardRequest,
	pub outcome: RelayOutcome,
	/// Every state the attempt went through, in order.
	pub history: Vec<RelayState>,
}

/// Native and token balance of one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balances {
	pub native: U256,
	pub token: U256,
}

pub struct RelayEngine {
	config: Config,
	delivery: Arc<DeliveryService>,
	forwarder: ForwarderClient,
	accounts: HashMap<String, Arc<AccountService>>,
	builder: RequestBuilder,
	execution: ExecutionParams,
	event_bus: EventBus,
	locks: AddressLocks,
}

impl RelayEngine {
	/// Relays `call` on the recipient on behalf of `identity`.
	///
	/// Failures before a signed request exists are returned as errors. Once
	/// signed, every result is a [`RelayOutcome`] inside the report.
	pub async fn relay(
		&self,
		identity: &AccountService,
		call: RecipientCall,
		options: RelayOptions,
	) -> Result<RelayReport, RelayError> {
		let from = identity.get_address().await.map_err(signing_error)?;
		let _guard = self.locks.acquire(from).await;

		let mut attempt = RelayAttempt::new(from, self.event_bus.clone());

		let domain = match self.forwarder.resolve_domain().await {
			Ok(domain) => domain,
			Err(e) => return Err(self.reject(&attempt, domain_error(e))),
		};

		let spec = RequestSpec {
			from,
			to: self.config.contracts.recipient,
			call,
			value: options.value,
			gas: options.gas,
			ttl_seconds: options.ttl_seconds,
		};
		let request = match self.builder.build(&spec, &self.forwarder).await {
			Ok(request) => request,
			Err(e) => return Err(self.reject(&attempt, request_error(e))),
		};
		attempt.transition(RelayState::Built)?;

		let signed = match sign_request(&domain, request, identity).await {
			Ok(signed) => signed,
			Err(e) => {
				attempt.transition(RelayState::SigningFailed)?;
				return Err(self.reject(&attempt, signing_error(e)));
			}
		};
		attempt.transition(RelayState::Signed)?;

		let pre_verify = options.pre_verify.unwrap_or(self.config.relay.pre_verify);
		let outcome = self.drive(&mut attempt, &signed, pre_verify).await?;
		attempt.transition(outcome.state())?;

		match &outcome {
			RelayOutcome::Executed { receipt } => info!(
				attempt = %attempt.id(),
				from = %from,
				nonce = %signed.nonce(),
				tx_hash = %truncate_hash(&receipt.hash.to_string()),
				"Relay attempt executed"
			),
			other => warn!(
				attempt = %attempt.id(),
				from = %from,
				nonce = %signed.nonce(),
				nonce_consumed = other.nonce_consumed(),
				"Relay attempt ended: {}",
				other
			),
		}

		self.event_bus
			.publish(RelayEvent::Attempt(AttemptEvent::Finished {
				attempt_id: attempt.id(),
				from,
				outcome: outcome.clone(),
			}))
			.ok();

		Ok(RelayReport {
			attempt_id: attempt.id(),
			request: signed,
			outcome,
			history: attempt.history().to_vec(),
		})
	}

	/// Relays `call` for the configured account `name`.
	pub async fn relay_for(
		&self,
		name: &str,
		call: RecipientCall,
		options: RelayOptions,
	) -> Result<RelayReport, RelayError> {
		let identity = self.account(name)?;
		self.relay(&identity, call, options).await
	}

	/// Gasless token transfer from account `name` to `to`.
	pub async fn transfer(
		&self,
		name: &str,
		to: Address,
		amount: U256,
		options: RelayOptions,
	) -> Result<RelayReport, RelayError> {
		self.relay_for(name, RecipientCall::Transfer { to, amount }, options)
			.await
	}

	/// Mints recipient tokens to `to` in an ordinary relayer transaction.
	pub async fn mint(&self, to: Address, amount: U256) -> Result<TransactionReceipt, RelayError> {
		let data = RecipientCall::Mint { to, amount }
			.encode()
			.map_err(request_error)?;
		let tx = Transaction::call(self.config.contracts.recipient, data, self.delivery.chain_id())
			.with_params(&self.execution);

		let receipt = self
			.delivery
			.deliver(tx)
			.await
			.map_err(|e| RelayError::Network {
				stage: RelayStage::Submit,
				reason: e.to_string(),
			})?;

		if !receipt.success {
			return Err(RelayError::Reverted(receipt));
		}

		info!(to = %to, amount = %amount, block = receipt.block_number, "Minted tokens");
		self.event_bus
			.publish(RelayEvent::Delivery(DeliveryEvent::TransactionConfirmed {
				attempt_id: None,
				receipt: receipt.clone(),
			}))
			.ok();

		Ok(receipt)
	}

	/// The forwarder's current EIP-712 domain.
	pub async fn domain(&self) -> Result<Domain, RelayError> {
		self.forwarder.resolve_domain().await.map_err(domain_error)
	}

	/// Forwarder nonce of `address`.
	pub async fn nonce(&self, address: Address) -> Result<U256, RelayError> {
		self.forwarder
			.nonce(address)
			.await
			.map_err(|e| RelayError::Read(e.to_string()))
	}

	pub async fn native_balance(&self, address: Address) -> Result<U256, RelayError> {
		self.delivery
			.balance(address)
			.await
			.map_err(|e| RelayError::Read(e.to_string()))
	}

	pub async fn token_balance(&self, address: Address) -> Result<U256, RelayError> {
		let data = self
			.delivery
			.call(
				self.config.contracts.recipient,
				IRecipient::balanceOfCall { account: address }
					.abi_encode()
					.into(),
			)
			.await
			.map_err(|e| RelayError::Read(e.to_string()))?;

		IRecipient::balanceOfCall::abi_decode_returns(&data)
			.map_err(|e| RelayError::Read(format!("balanceOf: {}", e)))
	}

	/// One-shot read of both balances.
	pub async fn balances(&self, address: Address) -> Result<Balances, RelayError> {
		Ok(Balances {
			native: self.native_balance(address).await?,
			token: self.token_balance(address).await?,
		})
	}

	pub fn account(&self, name: &str) -> Result<Arc<AccountService>, RelayError> {
		self.accounts
			.get(name)
			.cloned()
			.ok_or_else(|| RelayError::UnknownAccount(name.to_string()))
	}

	pub async fn account_address(&self, name: &str) -> Result<Address, RelayError> {
		self.account(name)?
			.get_address()
			.await
			.map_err(signing_error)
	}

	/// Configured account names, sorted.
	pub fn account_names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.accounts.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	/// Parses a whole-token amount with the recipient's decimals.
	pub fn parse_amount(&self, amount: &str) -> Result<U256, RelayError> {
		parse_amount(amount, self.config.request.token_decimals).map_err(request_error)
	}

	pub fn relayer(&self) -> Address {
		self.delivery.relayer()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
		self.event_bus.subscribe()
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Steps after signing. Never errors for chain-side failures, those
	/// become outcomes.
	async fn drive(
		&self,
		attempt: &mut RelayAttempt,
		signed: &SignedForwardRequest,
		pre_verify: bool,
	) -> Result<RelayOutcome, RelayError> {
		if pre_verify {
			match self.forwarder.verify(signed).await {
				Ok(true) => attempt.transition(RelayState::PreVerified)?,
				Ok(false) => {
					return Ok(RelayOutcome::VerificationFailed {
						stage: RelayStage::PreVerify,
						receipt: None,
					})
				}
				Err(e) => {
					return Ok(RelayOutcome::SubmissionError {
						stage: RelayStage::PreVerify,
						reason: e.to_string(),
					})
				}
			}
		}

		if self.delivery.relayer() == signed.from() {
			warn!(from = %signed.from(), "Relayer is relaying its own request and pays its own gas");
		}

		let pending = match self.forwarder.submit(signed, &self.execution).await {
			Ok(pending) => pending,
			Err(e) => return Ok(outcome_from(RelayStage::Submit, e)),
		};
		attempt.transition(RelayState::Submitted)?;

		self.event_bus
			.publish(RelayEvent::Delivery(DeliveryEvent::TransactionPending {
				attempt_id: Some(attempt.id()),
				tx_hash: pending.hash,
			}))
			.ok();

		match self.forwarder.confirm(&pending).await {
			Ok(receipt) => {
				self.event_bus
					.publish(RelayEvent::Delivery(DeliveryEvent::TransactionConfirmed {
						attempt_id: Some(attempt.id()),
						receipt: receipt.clone(),
					}))
					.ok();
				Ok(RelayOutcome::Executed { receipt })
			}
			Err(e) => Ok(outcome_from(RelayStage::Confirm, e)),
		}
	}

	fn reject(&self, attempt: &RelayAttempt, error: RelayError) -> RelayError {
		let stage = error.stage().unwrap_or(RelayStage::Domain);
		warn!(attempt = %attempt.id(), from = %attempt.from(), stage = %stage, error = %error, "Relay attempt rejected");

		self.event_bus
			.publish(RelayEvent::Attempt(AttemptEvent::Rejected {
				attempt_id: attempt.id(),
				from: attempt.from(),
				stage,
				reason: error.to_string(),
			}))
			.ok();

		error
	}
}

fn outcome_from(stage: RelayStage, error: ForwarderError) -> RelayOutcome {
	match error {
		ForwarderError::VerificationFailed { receipt } => {
			RelayOutcome::VerificationFailed { stage, receipt }
		}
		ForwarderError::ExecutionReverted {
			receipt,
			nonce_consumed,
		} => RelayOutcome::ExecutionReverted {
			receipt,
			nonce_consumed,
		},
		ForwarderError::Unconfirmed {
			tx_hash,
			reason,
			nonce_consumed,
		} => RelayOutcome::Unconfirmed {
			tx_hash,
			reason,
			nonce_consumed,
		},
		other => RelayOutcome::SubmissionError {
			stage,
			reason: other.to_string(),
		},
	}
}

fn domain_error(error: ForwarderError) -> RelayError {
	match error {
		ForwarderError::DomainUnavailable(reason) => RelayError::DomainUnavailable(reason),
		other => RelayError::DomainUnavailable(other.to_string()),
	}
}

fn request_error(error: RequestError) -> RelayError {
	match error {
		RequestError::InvalidAmount(reason) => RelayError::InvalidAmount(reason),
		RequestError::InvalidParameter(reason) => RelayError::InvalidRequest(reason),
		RequestError::NonceUnavailable(reason) => RelayError::Network {
			stage: RelayStage::Build,
			reason,
		},
	}
}

fn signing_error(error: AccountError) -> RelayError {
	match error {
		AccountError::SigningFailed(reason)
		| AccountError::InvalidKey(reason)
		| AccountError::InvalidConfig(reason) => RelayError::SigningFailed(reason),
	}
}

type AccountFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send>;
type DeliveryFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> + Send>;

/// Assembles a [`RelayEngine`] from configuration.
///
/// Implementations are looked up by the `provider` name of their config
/// section, so a factory has to be registered for every name in use.
pub struct RelayBuilder {
	config: Config,
	account_factories: HashMap<String, AccountFactory>,
	delivery_factories: HashMap<String, DeliveryFactory>,
	clock: Option<Arc<dyn Clock>>,
}

impl RelayBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			account_factories: HashMap::new(),
			delivery_factories: HashMap::new(),
			clock: None,
		}
	}

	pub fn with_account_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send + 'static,
	{
		self.account_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_delivery_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> + Send + 'static,
	{
		self.delivery_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Time source for request deadlines, the system clock by default.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	pub fn build(self) -> Result<RelayEngine, RelayError> {
		let delivery_config = &self.config.delivery;
		let delivery_factory = self
			.delivery_factories
			.get(&delivery_config.provider)
			.ok_or_else(|| {
				RelayError::Config(format!(
					"No delivery factory for provider '{}'",
					delivery_config.provider
				))
			})?;
		let provider = delivery_factory(&delivery_config.config)
			.map_err(|e| RelayError::Config(format!("delivery: {}", e)))?;
		let delivery = Arc::new(DeliveryService::new(
			provider,
			self.config.relay.confirmations,
			self.config.relay.confirmation_timeout(),
		));

		let mut accounts = HashMap::new();
		for (name, implementation) in &self.config.accounts {
			let factory = self
				.account_factories
				.get(&implementation.provider)
				.ok_or_else(|| {
					RelayError::Config(format!(
						"No account factory for provider '{}' (account '{}')",
						implementation.provider, name
					))
				})?;
			let account = factory(&implementation.config)
				.map_err(|e| RelayError::Config(format!("account '{}': {}", name, e)))?;
			accounts.insert(name.clone(), Arc::new(AccountService::new(account)));
		}

		let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
		let builder = RequestBuilder::new(clock)
			.with_defaults(self.config.request.gas, self.config.request.ttl_seconds);

		let forwarder = ForwarderClient::new(self.config.contracts.forwarder, delivery.clone());
		let execution = self.config.execution.params();
		let event_bus = EventBus::new(self.config.relay.event_capacity);

		info!(
			relay = %self.config.relay.name,
			relayer = %delivery.relayer(),
			chain_id = delivery.chain_id(),
			forwarder = %forwarder.address(),
			accounts = accounts.len(),
			"Relay engine ready"
		);

		Ok(RelayEngine {
			config: self.config,
			delivery,
			forwarder,
			accounts,
			builder,
			execution,
			event_bus,
			locks: AddressLocks::new(),
		})
	}
}
