use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use clap::Parser;
use relay_account::implementations::local::create_account;
use relay_config::{Config, ConfigLoader};
use relay_core::{RelayBuilder, RelayEngine, RelayOptions};
use relay_delivery::implementations::evm::alloy::create_http_delivery;
use relay_types::utils::{format_amount, truncate_hash};
use relay_types::{AttemptEvent, DeliveryEvent, RelayEvent, RelayOutcome};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Args, Command};

/// Decimals of the native currency.
const NATIVE_DECIMALS: u8 = 18;

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	setup_tracing(&args.log_level)?;

	info!("Loading configuration from: {:?}", args.config);
	let config = ConfigLoader::new()
		.with_file(&args.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	if let Command::Validate = args.command {
		return validate_config(&config);
	}

	let engine = RelayBuilder::new(config)
		.with_delivery_factory("alloy", create_http_delivery)
		.with_account_factory("local", create_account)
		.build()
		.context("Failed to build relay engine")?;

	match args.command {
		Command::Validate => Ok(()),
		Command::Domain => show_domain(&engine).await,
		Command::Nonce { account } => show_nonce(&engine, &account).await,
		Command::Balances => show_balances(&engine).await,
		Command::Mint { to, amount } => mint(&engine, &to, &amount).await,
		Command::Transfer {
			from,
			to,
			amount,
			gas,
			ttl,
			skip_verify,
		} => {
			let options = RelayOptions {
				gas,
				ttl_seconds: ttl,
				pre_verify: skip_verify.then_some(false),
				..Default::default()
			};
			transfer(&engine, &from, &to, &amount, options).await
		}
	}
}

fn validate_config(config: &Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Relay name: {}", config.relay.name);
	info!("Forwarder: {}", config.contracts.forwarder);
	info!("Recipient: {}", config.contracts.recipient);
	info!("Delivery: {}", config.delivery.provider);

	let mut names: Vec<_> = config.accounts.keys().collect();
	names.sort();
	for name in names {
		info!("  Account: {} ({})", name, config.accounts[name].provider);
	}

	Ok(())
}

async fn show_domain(engine: &RelayEngine) -> Result<()> {
	let domain = engine.domain().await.context("Failed to read domain")?;

	println!("name:              {}", domain.name);
	println!("version:           {}", domain.version);
	println!("chainId:           {}", domain.chain_id);
	println!("verifyingContract: {}", domain.verifying_contract);
	println!("separator:         {}", domain.to_eip712().separator());
	Ok(())
}

async fn show_nonce(engine: &RelayEngine, account: &str) -> Result<()> {
	let address = resolve_address(engine, account).await?;
	let nonce = engine.nonce(address).await.context("Failed to read nonce")?;

	println!("{} ({}): nonce {}", account, address, nonce);
	Ok(())
}

async fn show_balances(engine: &RelayEngine) -> Result<()> {
	let decimals = engine.config().request.token_decimals;

	println!("relayer: {}", engine.relayer());
	for name in engine.account_names() {
		let address = engine.account_address(name).await?;
		let balances = engine
			.balances(address)
			.await
			.with_context(|| format!("Failed to read balances of {}", name))?;

		println!(
			"{:<10} {}  native {}  token {}",
			name,
			address,
			format_amount(balances.native, NATIVE_DECIMALS),
			format_amount(balances.token, decimals)
		);
	}
	Ok(())
}

async fn mint(engine: &RelayEngine, to: &str, amount: &str) -> Result<()> {
	let address = resolve_address(engine, to).await?;
	let amount = engine.parse_amount(amount)?;

	let receipt = engine.mint(address, amount).await.context("Mint failed")?;
	println!(
		"minted {} to {} in block {} ({})",
		format_amount(amount, engine.config().request.token_decimals),
		address,
		receipt.block_number,
		receipt.hash
	);
	Ok(())
}

async fn transfer(
	engine: &RelayEngine,
	from: &str,
	to: &str,
	amount: &str,
	options: RelayOptions,
) -> Result<()> {
	let recipient = resolve_address(engine, to).await?;
	let amount = engine.parse_amount(amount)?;

	let mut events = engine.subscribe();
	let relay = engine.transfer(from, recipient, amount, options);
	tokio::pin!(relay);

	let report = loop {
		tokio::select! {
			result = &mut relay => break result.context("Relay attempt failed")?,
			Ok(event) = events.recv() => print_event(&event),
		}
	};
	while let Ok(event) = events.try_recv() {
		print_event(&event);
	}

	println!(
		"attempt {}: nonce {}, deadline {}",
		report.attempt_id,
		report.request.nonce(),
		report.request.deadline()
	);

	match &report.outcome {
		RelayOutcome::Executed { receipt } => {
			println!(
				"executed in block {} ({}), gas used {}",
				receipt.block_number, receipt.hash, receipt.gas_used
			);
			Ok(())
		}
		outcome if outcome.nonce_consumed() => {
			bail!("{}; the request is spent, build a new one to retry", outcome)
		}
		outcome => bail!("{}", outcome),
	}
}

fn print_event(event: &RelayEvent) {
	match event {
		RelayEvent::Attempt(AttemptEvent::StateChanged {
			previous, state, ..
		}) => match previous {
			Some(previous) => println!("  {} -> {}", previous, state),
			None => println!("  {}", state),
		},
		RelayEvent::Attempt(AttemptEvent::Rejected { stage, reason, .. }) => {
			println!("  rejected at {}: {}", stage, reason)
		}
		RelayEvent::Delivery(DeliveryEvent::TransactionPending { tx_hash, .. }) => {
			println!("  pending {}", truncate_hash(&tx_hash.to_string()))
		}
		RelayEvent::Delivery(DeliveryEvent::TransactionConfirmed { receipt, .. }) => {
			println!("  included in block {}", receipt.block_number)
		}
		RelayEvent::Attempt(AttemptEvent::Finished { .. }) => {}
	}
}

/// Accepts a configured account name or a hex address.
async fn resolve_address(engine: &RelayEngine, target: &str) -> Result<Address> {
	if target.starts_with("0x") {
		return target
			.parse()
			.with_context(|| format!("Invalid address: {}", target));
	}

	Ok(engine.account_address(target).await?)
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
