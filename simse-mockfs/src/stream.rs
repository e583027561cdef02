// ---------------------------------------------------------------------------
// File streams — cursor-based byte access to a file node
// ---------------------------------------------------------------------------

use std::fmt;
use std::io::{self, SeekFrom};
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{FsError, FsResult};
use crate::fs::Shared;
use crate::locks::{HandleId, Released};
use crate::store::{Node, NodeId};

// ---------------------------------------------------------------------------
// Open options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
	/// Create a new file; fail when it exists.
	CreateNew,
	/// Create a new file or truncate an existing one.
	Create,
	/// Open an existing file.
	Open,
	OpenOrCreate,
	/// Open an existing file and cut it to zero length.
	Truncate,
	/// Open or create, positioned at the end, write-only.
	Append,
}

impl fmt::Display for FileMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::CreateNew => "CreateNew",
			Self::Create => "Create",
			Self::Open => "Open",
			Self::OpenOrCreate => "OpenOrCreate",
			Self::Truncate => "Truncate",
			Self::Append => "Append",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileAccess {
	Read,
	Write,
	ReadWrite,
}

impl FileAccess {
	pub fn can_read(self) -> bool {
		matches!(self, Self::Read | Self::ReadWrite)
	}

	pub fn can_write(self) -> bool {
		matches!(self, Self::Write | Self::ReadWrite)
	}
}

impl fmt::Display for FileAccess {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Read => "Read",
			Self::Write => "Write",
			Self::ReadWrite => "ReadWrite",
		};
		f.write_str(name)
	}
}

bitflags! {
	/// Advanced open flags. Only `ENCRYPTED` and `DELETE_ON_CLOSE` change
	/// behavior; the rest are accepted hints.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct FileOptions: u32 {
		const ENCRYPTED = 0x0000_4000;
		const DELETE_ON_CLOSE = 0x0400_0000;
		const SEQUENTIAL_SCAN = 0x0800_0000;
		const RANDOM_ACCESS = 0x1000_0000;
		const ASYNCHRONOUS = 0x4000_0000;
		const WRITE_THROUGH = 0x8000_0000;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
	pub mode: FileMode,
	pub access: FileAccess,
	pub options: FileOptions,
}

impl OpenOptions {
	/// Options for `mode` with the platform's default access: write-only for
	/// `Append`, read-write otherwise.
	pub fn new(mode: FileMode) -> Self {
		let access = match mode {
			FileMode::Append => FileAccess::Write,
			_ => FileAccess::ReadWrite,
		};
		Self {
			mode,
			access,
			options: FileOptions::empty(),
		}
	}

	pub fn access(mut self, access: FileAccess) -> Self {
		self.access = access;
		self
	}

	pub fn options(mut self, options: FileOptions) -> Self {
		self.options = options;
		self
	}

	/// Reject mode/access pairs that can never be satisfied.
	pub(crate) fn validate(&self) -> FsResult<()> {
		if self.mode == FileMode::Append && self.access != FileAccess::Write {
			return Err(FsError::AppendRequiresWriteOnly);
		}
		let needs_write = matches!(
			self.mode,
			FileMode::CreateNew | FileMode::Create | FileMode::Truncate
		);
		if needs_write && !self.access.can_write() {
			return Err(FsError::InvalidModeAccess {
				mode: self.mode,
				access: self.access,
			});
		}
		if self.options.contains(FileOptions::ENCRYPTED) {
			return Err(FsError::EncryptionNotSupported);
		}
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// FileStream
// ---------------------------------------------------------------------------

/// An open handle on a file node with its own cursor.
///
/// The handle stays registered in the lock table until [`FileStream::close`]
/// is called or the stream is dropped.
pub struct FileStream {
	shared: Arc<Shared>,
	node: NodeId,
	handle: HandleId,
	key: String,
	name: String,
	access: FileAccess,
	position: u64,
	disposed: bool,
}

impl fmt::Debug for FileStream {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FileStream")
			.field("name", &self.name)
			.field("access", &self.access)
			.field("position", &self.position)
			.field("disposed", &self.disposed)
			.finish()
	}
}

impl FileStream {
	pub(crate) fn new(
		shared: Arc<Shared>,
		node: NodeId,
		handle: HandleId,
		key: String,
		name: String,
		access: FileAccess,
		position: u64,
	) -> Self {
		Self {
			shared,
			node,
			handle,
			key,
			name,
			access,
			position,
			disposed: false,
		}
	}

	/// Full path the stream was opened with.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn can_read(&self) -> bool {
		!self.disposed && self.access.can_read()
	}

	pub fn can_write(&self) -> bool {
		!self.disposed && self.access.can_write()
	}

	pub fn can_seek(&self) -> bool {
		!self.disposed
	}

	pub fn is_closed(&self) -> bool {
		self.disposed
	}

	pub fn position(&self) -> FsResult<u64> {
		self.ensure_open()?;
		Ok(self.position)
	}

	pub fn length(&self) -> FsResult<u64> {
		self.ensure_open()?;
		let state = self.shared.lock();
		Ok(self.file(state.store.node(self.node))?.len())
	}

	/// Read into `buf` from the cursor. Returns 0 at or past end of file.
	pub fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
		self.ensure_open()?;
		if !self.access.can_read() {
			return Err(FsError::ReadNotSupported);
		}
		let now = self.shared.clock.now_utc();
		let mut state = self.shared.lock();
		let node = self.file_mut(state.store.node_mut(self.node))?;
		let data = node.data().map(Vec::as_slice).unwrap_or_default();
		let start = usize::try_from(self.position).unwrap_or(usize::MAX).min(data.len());
		let count = buf.len().min(data.len() - start);
		buf[..count].copy_from_slice(&data[start..start + count]);
		node.times.last_access = now;
		self.position += count as u64;
		Ok(count)
	}

	/// Everything from the cursor to end of file.
	pub fn read_to_end_bytes(&mut self) -> FsResult<Vec<u8>> {
		let remaining = self.length()?.saturating_sub(self.position);
		let mut buf = vec![0u8; remaining as usize];
		let count = self.read(&mut buf)?;
		buf.truncate(count);
		Ok(buf)
	}

	/// Write all of `buf` at the cursor, extending the file as needed.
	pub fn write(&mut self, buf: &[u8]) -> FsResult<usize> {
		self.ensure_open()?;
		if !self.access.can_write() {
			return Err(FsError::WriteNotSupported);
		}
		let now = self.shared.clock.now_utc();
		let mut state = self.shared.lock();
		let node = self.file_mut(state.store.node_mut(self.node))?;
		let end = self
			.position
			.checked_add(buf.len() as u64)
			.ok_or(FsError::StreamTooLong)?;
		if let Some(data) = node.data_mut() {
			if (data.len() as u64) < end {
				grow(data, end)?;
			}
			let start = self.position as usize;
			data[start..start + buf.len()].copy_from_slice(buf);
		}
		node.times.last_write = now;
		node.times.last_access = now;
		self.position += buf.len() as u64;
		Ok(buf.len())
	}

	/// Move the cursor. Landing past the end of a writable stream grows the
	/// file immediately with zero bytes.
	pub fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
		self.ensure_open()?;
		let now = self.shared.clock.now_utc();
		let mut state = self.shared.lock();
		let node = self.file_mut(state.store.node_mut(self.node))?;
		let len = node.len();
		let target = match pos {
			SeekFrom::Start(offset) => i128::from(offset),
			SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
			SeekFrom::End(delta) => i128::from(len) + i128::from(delta),
		};
		if target < 0 {
			return Err(FsError::SeekBeforeBegin);
		}
		let target = u64::try_from(target).unwrap_or(u64::MAX);
		if target > len && self.access.can_write() {
			if let Some(data) = node.data_mut() {
				grow(data, target)?;
			}
			node.times.last_write = now;
			node.times.last_access = now;
		}
		self.position = target;
		Ok(target)
	}

	/// Truncate or zero-extend the file. The cursor is pulled back when it
	/// would sit past the new end.
	pub fn set_length(&mut self, length: u64) -> FsResult<()> {
		self.ensure_open()?;
		if !self.access.can_write() {
			return Err(FsError::WriteNotSupported);
		}
		let now = self.shared.clock.now_utc();
		let mut state = self.shared.lock();
		let node = self.file_mut(state.store.node_mut(self.node))?;
		if let Some(data) = node.data_mut() {
			if length > data.len() as u64 {
				grow(data, length)?;
			} else {
				data.truncate(length as usize);
			}
		}
		node.times.last_write = now;
		node.times.last_access = now;
		self.position = self.position.min(length);
		Ok(())
	}

	pub fn flush(&mut self) -> FsResult<()> {
		self.ensure_open()
	}

	/// Release the handle. Idempotent. The last handle of a delete-on-close
	/// registration removes the file.
	pub fn close(&mut self) {
		if self.disposed {
			return;
		}
		self.disposed = true;
		let mut state = self.shared.lock();
		if state.locks.release(&self.key, self.handle) == Released::Delete {
			state.store.remove(self.node);
			tracing::debug!(path = %self.name, "delete-on-close removed file");
		}
	}

	fn ensure_open(&self) -> FsResult<()> {
		if self.disposed {
			return Err(FsError::Disposed);
		}
		Ok(())
	}

	fn file<'a>(&self, node: Option<&'a Node>) -> FsResult<&'a Node> {
		node.ok_or_else(|| FsError::FileNotFound {
			path: self.name.clone(),
		})
	}

	fn file_mut<'a>(&self, node: Option<&'a mut Node>) -> FsResult<&'a mut Node> {
		node.ok_or_else(|| FsError::FileNotFound {
			path: self.name.clone(),
		})
	}
}

/// Largest length a stream may reach, matching the platform's signed 64-bit
/// file offsets.
pub const MAX_STREAM_LENGTH: u64 = i64::MAX as u64;

/// Zero-extend `data` to `length` bytes. Leaves `data` untouched when the
/// length is out of range or cannot be allocated.
fn grow(data: &mut Vec<u8>, length: u64) -> FsResult<()> {
	if length > MAX_STREAM_LENGTH {
		return Err(FsError::StreamTooLong);
	}
	let length = usize::try_from(length).map_err(|_| FsError::StreamTooLong)?;
	data.try_reserve_exact(length.saturating_sub(data.len()))
		.map_err(|_| FsError::StreamTooLong)?;
	data.resize(length, 0);
	Ok(())
}

impl Drop for FileStream {
	fn drop(&mut self) {
		self.close();
	}
}

impl io::Read for FileStream {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		FileStream::read(self, buf).map_err(io::Error::from)
	}
}

impl io::Write for FileStream {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		FileStream::write(self, buf).map_err(io::Error::from)
	}

	fn flush(&mut self) -> io::Result<()> {
		FileStream::flush(self).map_err(io::Error::from)
	}
}

impl io::Seek for FileStream {
	fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
		FileStream::seek(self, pos).map_err(io::Error::from)
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
