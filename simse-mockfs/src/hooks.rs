use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Called by copy between creating the destination and transferring bytes.
/// The engine lock is not held while these run.
pub trait CopySync: Send + Sync {
	fn on_copy_started(&self);
	fn wait_for_release(&self);
}

/// Copies run straight through.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCopySync;

impl CopySync for NoCopySync {
	fn on_copy_started(&self) {}
	fn wait_for_release(&self) {}
}

#[derive(Debug, Default)]
struct GateState {
	started: bool,
	released: bool,
}

/// One-shot gate that parks copies until [`CopyGate::release`] is called.
/// Once released it stays open.
#[derive(Debug, Default)]
pub struct CopyGate {
	state: Mutex<GateState>,
	signal: Condvar,
}

impl CopyGate {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, GateState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn is_started(&self) -> bool {
		self.lock().started
	}

	/// Block until a copy has reached the gate.
	pub fn wait_until_started(&self) {
		let mut state = self.lock();
		while !state.started {
			state = self
				.signal
				.wait(state)
				.unwrap_or_else(PoisonError::into_inner);
		}
	}

	/// Like [`CopyGate::wait_until_started`] but gives up after `timeout`.
	/// Returns whether a copy arrived.
	pub fn wait_until_started_for(&self, timeout: Duration) -> bool {
		let state = self.lock();
		let (state, _) = self
			.signal
			.wait_timeout_while(state, timeout, |s| !s.started)
			.unwrap_or_else(PoisonError::into_inner);
		state.started
	}

	pub fn release(&self) {
		self.lock().released = true;
		self.signal.notify_all();
	}
}

impl CopySync for CopyGate {
	fn on_copy_started(&self) {
		self.lock().started = true;
		self.signal.notify_all();
	}

	fn wait_for_release(&self) {
		let mut state = self.lock();
		while !state.released {
			state = self
				.signal
				.wait(state)
				.unwrap_or_else(PoisonError::into_inner);
		}
	}
}
