//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gasless-relay")]
#[command(about = "EIP-2771 meta-transaction relay", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "RELAY_CONFIG", default_value = "config/relay.toml")]
	pub config: PathBuf,

	/// Log level (trace, debug, info, warn, error), RUST_LOG takes precedence
	#[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Validate the configuration file
	Validate,

	/// Show the forwarder's EIP-712 domain
	Domain,

	/// Show the forwarder nonce of an account
	Nonce {
		/// Account name or hex address
		account: String,
	},

	/// Show native and token balances of every configured account
	Balances,

	/// Mint tokens from the relayer (ordinary transaction)
	Mint {
		/// Account name or hex address
		#[arg(long)]
		to: String,

		/// Amount in whole tokens
		#[arg(long)]
		amount: String,
	},

	/// Relay a gasless token transfer
	Transfer {
		/// Configured account that signs the request
		#[arg(long)]
		from: String,

		/// Account name or hex address
		#[arg(long)]
		to: String,

		/// Amount in whole tokens
		#[arg(long)]
		amount: String,

		/// Gas budget for the forwarded call
		#[arg(long)]
		gas: Option<u64>,

		/// Request lifetime in seconds
		#[arg(long)]
		ttl: Option<u64>,

		/// Submit without calling the forwarder's verify first
		#[arg(long)]
		skip_verify: bool,
	},
}
