use std::fmt;
use std::sync::Arc;

use clap::Parser;

use crate::clock::{Clock, SystemClock};
use crate::hooks::{CopySync, NoCopySync};

pub const DEFAULT_CURRENT_DIRECTORY: &str = r"C:\";
pub const DEFAULT_DRIVE_FORMAT: &str = "NTFS";

// ── Library options ─────────────────────────────────────────────────────────

/// Construction-time capabilities and defaults for a `MockFileSystem`.
#[derive(Clone)]
pub struct MockFileSystemOptions {
	pub clock: Arc<dyn Clock>,
	pub copy_sync: Arc<dyn CopySync>,
	/// Starting current directory; created if missing.
	pub current_directory: String,
	/// Format tag given to drives that are mounted implicitly.
	pub drive_format: String,
}

impl Default for MockFileSystemOptions {
	fn default() -> Self {
		Self {
			clock: Arc::new(SystemClock),
			copy_sync: Arc::new(NoCopySync),
			current_directory: DEFAULT_CURRENT_DIRECTORY.to_string(),
			drive_format: DEFAULT_DRIVE_FORMAT.to_string(),
		}
	}
}

impl fmt::Debug for MockFileSystemOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MockFileSystemOptions")
			.field("current_directory", &self.current_directory)
			.field("drive_format", &self.drive_format)
			.finish_non_exhaustive()
	}
}

impl MockFileSystemOptions {
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn with_copy_sync(mut self, copy_sync: Arc<dyn CopySync>) -> Self {
		self.copy_sync = copy_sync;
		self
	}

	pub fn with_current_directory(mut self, dir: impl Into<String>) -> Self {
		self.current_directory = dir.into();
		self
	}

	pub fn with_drive_format(mut self, format: impl Into<String>) -> Self {
		self.drive_format = format.into();
		self
	}
}

// ── Server CLI ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
	name = "simse-mockfs-engine",
	about = "Simulated in-memory filesystem over JSON-RPC 2.0 / NDJSON stdio"
)]
pub struct CliArgs {
	/// Initial current directory of the simulated filesystem
	#[arg(long, default_value = DEFAULT_CURRENT_DIRECTORY, env = "SIMSE_MOCKFS_CURRENT_DIRECTORY")]
	pub current_directory: String,

	/// Format tag for implicitly mounted drives (e.g. NTFS, FAT16)
	#[arg(long, default_value = DEFAULT_DRIVE_FORMAT, env = "SIMSE_MOCKFS_DRIVE_FORMAT")]
	pub drive_format: String,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "SIMSE_MOCKFS_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	pub fn fs_options(&self) -> MockFileSystemOptions {
		MockFileSystemOptions::default()
			.with_current_directory(self.current_directory.clone())
			.with_drive_format(self.drive_format.clone())
	}
}
