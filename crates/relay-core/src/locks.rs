//! Per-address serialization of relay attempts.

use alloy::primitives::Address;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<Address, Arc<Mutex<()>>>;

/// One async mutex per `from` address.
///
/// Two attempts for the same signer would race for the same nonce, so they
/// run one after the other. Different signers never wait on each other.
/// Entries only live while an attempt holds or waits for them.
#[derive(Default)]
pub struct AddressLocks {
	locks: Arc<LockMap>,
}

impl AddressLocks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits for exclusive use of `address`. Released when the guard drops.
	pub async fn acquire(&self, address: Address) -> AddressGuard {
		let lock = self.locks.entry(address).or_default().clone();
		let guard = lock.lock_owned().await;

		AddressGuard {
			address,
			guard: Some(guard),
			locks: self.locks.clone(),
		}
	}

	/// Number of addresses with an attempt in flight or waiting.
	pub fn len(&self) -> usize {
		self.locks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.locks.is_empty()
	}
}

/// Exclusive hold on one address.
pub struct AddressGuard {
	address: Address,
	guard: Option<OwnedMutexGuard<()>>,
	locks: Arc<LockMap>,
}

impl Drop for AddressGuard {
	fn drop(&mut self) {
		drop(self.guard.take());
		// New holders clone under the shard lock, so a count of 1 means nobody waits
		self.locks
			.remove_if(&self.address, |_, lock| Arc::strong_count(lock) == 1);
	}
}
