use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Time source for every timestamp the filesystem stamps.
pub trait Clock: Send + Sync {
	fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_utc(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

impl<F> Clock for F
where
	F: Fn() -> DateTime<Utc> + Send + Sync,
{
	fn now_utc(&self) -> DateTime<Utc> {
		self()
	}
}

/// A clock that only moves when told to. Tests use it to assert exact
/// timestamps.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
	pub fn new(start: DateTime<Utc>) -> Self {
		Self {
			now: Mutex::new(start),
		}
	}

	pub fn set(&self, now: DateTime<Utc>) {
		*self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
	}

	/// Move the clock forward and return the new time.
	pub fn advance(&self, by: Duration) -> DateTime<Utc> {
		let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
		*now += by;
		*now
	}
}

impl Clock for ManualClock {
	fn now_utc(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
