// ---------------------------------------------------------------------------
// MockFileSystem — operation layer over the path resolver, entry store,
// lock table and streams
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::config::MockFileSystemOptions;
use crate::error::{FsError, FsResult};
use crate::hooks::CopySync;
use crate::locks::LockTable;
use crate::path::{normalize, PathContext, ResolvedPath, Root};
use crate::store::{EntryStore, FileAttributes, FileTimes, Node, NodeId};
use crate::stream::{FileAccess, FileMode, FileOptions, FileStream, OpenOptions};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything a lookup-then-mutate sequence touches. Guarded as one unit.
pub(crate) struct State {
	pub store: EntryStore,
	pub locks: LockTable,
	pub context: PathContext,
	pub drive_format: String,
}

impl State {
	fn resolve(&self, raw: Option<&str>, param: &'static str) -> FsResult<ResolvedPath> {
		normalize(raw, param, &self.context)
	}

	fn node(&self, id: NodeId, path: &ResolvedPath) -> FsResult<&Node> {
		self.store.node(id).ok_or_else(|| FsError::FileNotFound {
			path: path.to_string(),
		})
	}

	fn node_mut(&mut self, id: NodeId, path: &ResolvedPath) -> FsResult<&mut Node> {
		self.store.node_mut(id).ok_or_else(|| FsError::FileNotFound {
			path: path.to_string(),
		})
	}

	/// Existing file or directory. A missing parent reports the directory
	/// failure, a missing leaf the file failure.
	fn entry(&self, path: &ResolvedPath) -> FsResult<NodeId> {
		if path.is_root() {
			return self.store.find(path).ok_or_else(|| FsError::DirectoryNotFound {
				path: path.to_string(),
			});
		}
		let parent = self.store.find_parent(path)?;
		let name = path.file_name().unwrap_or_default();
		self.store
			.child(parent, name)
			.ok_or_else(|| FsError::FileNotFound {
				path: path.to_string(),
			})
	}

	/// Existing file; a directory at `path` is an access failure.
	fn existing_file(&self, path: &ResolvedPath) -> FsResult<NodeId> {
		match self.store.find(path) {
			Some(id) if self.store.node(id).is_some_and(Node::is_directory) => Err(FsError::AccessDenied {
				path: path.to_string(),
			}),
			Some(id) => Ok(id),
			None => Err(FsError::FileNotFound {
				path: path.to_string(),
			}),
		}
	}
}

pub(crate) struct Shared {
	state: Mutex<State>,
	pub clock: Arc<dyn Clock>,
	pub copy_sync: Arc<dyn CopySync>,
}

impl Shared {
	/// State is only mutated after validation, so a poisoned lock still holds
	/// a consistent tree.
	pub fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

fn check_reserved(path: &ResolvedPath) -> FsResult<()> {
	if path.reserved_segment().is_some() {
		return Err(FsError::ReservedName {
			path: path.to_string(),
		});
	}
	Ok(())
}

fn supports_encryption(format: &str) -> bool {
	let format = format.to_ascii_uppercase();
	!(format.starts_with("FAT") || format == "EXFAT")
}

fn normalize_file_attributes(attributes: FileAttributes) -> FileAttributes {
	let attributes = attributes - FileAttributes::DIRECTORY;
	if attributes.is_empty() {
		FileAttributes::NORMAL
	} else if attributes != FileAttributes::NORMAL {
		attributes - FileAttributes::NORMAL
	} else {
		attributes
	}
}

// ---------------------------------------------------------------------------
// MockFileSystem
// ---------------------------------------------------------------------------

/// An in-memory filesystem with Windows path, sharing and timestamp rules.
///
/// Cloning is cheap and every clone operates on the same tree, so a clone can
/// be handed to another thread (for example to run a gated copy).
#[derive(Clone)]
pub struct MockFileSystem {
	shared: Arc<Shared>,
}

impl Default for MockFileSystem {
	fn default() -> Self {
		Self::new()
	}
}

impl MockFileSystem {
	// -- Construction -----------------------------------------------------

	/// A filesystem with an empty `C:` drive as the current directory.
	pub fn new() -> Self {
		Self::build(MockFileSystemOptions::default())
	}

	/// Build with injected capabilities. The configured current directory is
	/// created when missing.
	pub fn with_options(options: MockFileSystemOptions) -> FsResult<Self> {
		let current = options.current_directory.clone();
		let fs = Self::build(options);
		fs.create_directory(current.as_str())?;
		fs.set_current_directory(current.as_str())?;
		Ok(fs)
	}

	fn build(options: MockFileSystemOptions) -> Self {
		let now = options.clock.now_utc();
		let context = PathContext::default();
		let mut store = EntryStore::new();
		store.mount(context.current().root(), &options.drive_format, now);
		Self {
			shared: Arc::new(Shared {
				state: Mutex::new(State {
					store,
					locks: LockTable::new(),
					context,
					drive_format: options.drive_format,
				}),
				clock: options.clock,
				copy_sync: options.copy_sync,
			}),
		}
	}

	fn now(&self) -> DateTime<Utc> {
		self.shared.clock.now_utc()
	}

	// -- Volumes and current directory ------------------------------------

	/// Mount a drive (`D:`, `D:\`) or UNC share (`\\server\share`) with the
	/// given format tag. Re-adding an existing root only changes its format.
	pub fn add_drive(&self, root: &str, format: &str) -> FsResult<()> {
		let now = self.now();
		let mut state = self.shared.lock();
		let path = state.resolve(Some(root), "driveName")?;
		let root = path.root().clone();
		if state.store.is_mounted(&root) {
			state.store.set_volume_format(&root, format);
		} else {
			state.store.mount(&root, format, now);
		}
		tracing::debug!(root = %root, format, "volume mounted");
		Ok(())
	}

	/// Make a UNC share reachable. Paths on shares that were never added
	/// behave as missing.
	pub fn add_share(&self, unc: &str) -> FsResult<()> {
		let format = self.shared.lock().drive_format.clone();
		self.add_drive(unc, &format)
	}

	/// Mounted roots, sorted.
	pub fn drives(&self) -> Vec<String> {
		let state = self.shared.lock();
		state
			.store
			.volume_roots()
			.iter()
			.map(Root::to_string)
			.collect()
	}

	/// Format tag of the volume holding `path`.
	pub fn drive_format(&self, path: &str) -> FsResult<String> {
		let state = self.shared.lock();
		let path = state.resolve(Some(path), "path")?;
		state
			.store
			.volume_format(path.root())
			.map(str::to_string)
			.ok_or_else(|| FsError::DirectoryNotFound {
				path: path.root().to_string(),
			})
	}

	pub fn current_directory(&self) -> String {
		self.shared.lock().context.current().to_string()
	}

	pub fn set_current_directory<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<()> {
		let mut state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		if state.store.find_directory(&path).is_none() {
			return Err(FsError::DirectoryNotFound {
				path: path.to_string(),
			});
		}
		state.context.set_current(path);
		Ok(())
	}

	/// Fully qualified form of `path` against the current context.
	pub fn full_path<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<String> {
		let state = self.shared.lock();
		Ok(state.resolve(path.into(), "path")?.to_string())
	}

	/// Path of an existing entry spelled with the casing it is stored under.
	pub fn stored_path<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<String> {
		let state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		let id = state.entry(&path)?;
		state
			.store
			.path_of(id)
			.map(|p| p.to_string())
			.ok_or_else(|| FsError::FileNotFound {
				path: path.to_string(),
			})
	}

	// -- Queries ----------------------------------------------------------

	/// True for an existing file. Invalid paths and directories are `false`.
	pub fn exists<'a>(&self, path: impl Into<Option<&'a str>>) -> bool {
		let state = self.shared.lock();
		match state.resolve(path.into(), "path") {
			Ok(path) => state.store.find_file(&path).is_some(),
			Err(_) => false,
		}
	}

	pub fn directory_exists<'a>(&self, path: impl Into<Option<&'a str>>) -> bool {
		let state = self.shared.lock();
		match state.resolve(path.into(), "path") {
			Ok(path) => state.store.find_directory(&path).is_some(),
			Err(_) => false,
		}
	}

	pub fn file_length<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<u64> {
		let state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		let id = state
			.store
			.find_file(&path)
			.ok_or_else(|| FsError::FileNotFound {
				path: path.to_string(),
			})?;
		Ok(state.node(id, &path)?.len())
	}

	// -- Open / create ----------------------------------------------------

	/// `FileMode::Create` with read-write access.
	pub fn create_file<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<FileStream> {
		self.open(path, OpenOptions::new(FileMode::Create))
	}

	pub fn open<'a>(
		&self,
		path: impl Into<Option<&'a str>>,
		options: OpenOptions,
	) -> FsResult<FileStream> {
		let now = self.now();
		let mut state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		options.validate()?;
		check_reserved(&path)?;
		if path.is_root() {
			return Err(FsError::AccessDenied {
				path: path.to_string(),
			});
		}
		let parent = state.store.find_parent(&path)?;
		let name = path.file_name().unwrap_or_default();
		let delete_on_close = options.options.contains(FileOptions::DELETE_ON_CLOSE);

		let (node, handle) = match state.store.child(parent, name) {
			Some(id) => {
				let existing = state.node(id, &path)?;
				if existing.is_directory() {
					return Err(FsError::AccessDenied {
						path: path.to_string(),
					});
				}
				if options.mode == FileMode::CreateNew {
					return Err(FsError::FileExists {
						path: path.to_string(),
					});
				}
				if existing.is_read_only() && options.access.can_write() {
					return Err(FsError::AccessDenied {
						path: path.to_string(),
					});
				}
				let handle = state.locks.acquire(&path, options.access, delete_on_close)?;
				if matches!(options.mode, FileMode::Create | FileMode::Truncate) {
					let node = state.node_mut(id, &path)?;
					if let Some(data) = node.data_mut() {
						data.clear();
					}
					node.times.last_write = now;
					node.times.last_access = now;
				}
				(id, handle)
			}
			None => {
				if matches!(options.mode, FileMode::Open | FileMode::Truncate) {
					return Err(FsError::FileNotFound {
						path: path.to_string(),
					});
				}
				let handle = state.locks.acquire(&path, options.access, delete_on_close)?;
				let id = state.store.insert_file(
					parent,
					name,
					FileAttributes::ARCHIVE,
					FileTimes::at(now),
				);
				(id, handle)
			}
		};

		let position = match options.mode {
			FileMode::Append => state.store.node(node).map_or(0, Node::len),
			_ => 0,
		};
		drop(state);

		tracing::debug!(path = %path, mode = %options.mode, access = %options.access, "open");
		Ok(FileStream::new(
			Arc::clone(&self.shared),
			node,
			handle,
			path.key(),
			path.to_string(),
			options.access,
			position,
		))
	}

	// -- Whole-file helpers -----------------------------------------------

	pub fn read_all_bytes<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<Vec<u8>> {
		let mut stream = self.open(path, OpenOptions::new(FileMode::Open).access(FileAccess::Read))?;
		let bytes = stream.read_to_end_bytes()?;
		stream.close();
		Ok(bytes)
	}

	pub fn write_all_bytes<'a>(
		&self,
		path: impl Into<Option<&'a str>>,
		bytes: &[u8],
	) -> FsResult<()> {
		let mut stream = self.open(path, OpenOptions::new(FileMode::Create).access(FileAccess::Write))?;
		stream.write(bytes)?;
		stream.close();
		Ok(())
	}

	pub fn read_all_text<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<String> {
		let bytes = self.read_all_bytes(path)?;
		Ok(String::from_utf8_lossy(&bytes).into_owned())
	}

	pub fn write_all_text<'a>(&self, path: impl Into<Option<&'a str>>, text: &str) -> FsResult<()> {
		self.write_all_bytes(path, text.as_bytes())
	}

	pub fn append_all_text<'a>(&self, path: impl Into<Option<&'a str>>, text: &str) -> FsResult<()> {
		let mut stream = self.open(path, OpenOptions::new(FileMode::Append))?;
		stream.write(text.as_bytes())?;
		stream.close();
		Ok(())
	}

	// -- Delete -----------------------------------------------------------

	/// Delete a file. A missing file is not an error; a missing parent
	/// directory is.
	pub fn delete<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<()> {
		let mut state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		if path.is_root() {
			return Err(FsError::AccessDenied {
				path: path.to_string(),
			});
		}
		let parent = state.store.find_parent(&path)?;
		let Some(id) = state.store.child(parent, path.file_name().unwrap_or_default()) else {
			return Ok(());
		};
		let node = state.node(id, &path)?;
		if node.is_directory() || node.is_read_only() {
			return Err(FsError::AccessDenied {
				path: path.to_string(),
			});
		}
		state.locks.ensure_unlocked(&path)?;
		state.store.remove(id);
		tracing::debug!(path = %path, "delete");
		Ok(())
	}

	// -- Move -------------------------------------------------------------

	/// Relocate a file. Fails when the destination exists.
	pub fn move_file<'a>(
		&self,
		source: impl Into<Option<&'a str>>,
		destination: impl Into<Option<&'a str>>,
	) -> FsResult<()> {
		self.move_file_inner(source.into(), destination.into(), false)
	}

	/// Relocate a file, replacing an existing destination file.
	pub fn move_file_overwrite<'a>(
		&self,
		source: impl Into<Option<&'a str>>,
		destination: impl Into<Option<&'a str>>,
	) -> FsResult<()> {
		self.move_file_inner(source.into(), destination.into(), true)
	}

	fn move_file_inner(
		&self,
		source: Option<&str>,
		destination: Option<&str>,
		overwrite: bool,
	) -> FsResult<()> {
		let mut state = self.shared.lock();
		let src = state.resolve(source, "sourceFileName")?;
		let dst = state.resolve(destination, "destFileName")?;
		check_reserved(&dst)?;

		let src_id = state
			.store
			.find_file(&src)
			.ok_or_else(|| FsError::FileNotFound {
				path: src.to_string(),
			})?;
		if dst.is_root() {
			return Err(FsError::AccessDenied {
				path: dst.to_string(),
			});
		}
		let dst_parent = state.store.find_parent(&dst)?;
		state.locks.ensure_unlocked(&src)?;

		if !src.same_entry(&dst) {
			if let Some(existing) = state.store.child(dst_parent, dst.file_name().unwrap_or_default()) {
				let node = state.node(existing, &dst)?;
				if !overwrite || node.is_directory() {
					return Err(FsError::MoveTargetExists {
						path: dst.to_string(),
					});
				}
				if node.is_read_only() {
					return Err(FsError::AccessDenied {
						path: dst.to_string(),
					});
				}
				state.locks.ensure_unlocked(&dst)?;
				state.store.remove(existing);
			}
		}

		state.store.reparent(src_id, &dst)?;
		tracing::debug!(src = %src, dst = %dst, "move");
		Ok(())
	}

	// -- Copy -------------------------------------------------------------

	/// Copy a file in three phases: create the destination (under the engine
	/// lock), transfer bytes after the copy hook releases (lock not held),
	/// then stamp both last-access times with the completion time. A read
	/// handle on the source and a write handle on the destination stay
	/// registered from the first phase to the last.
	pub fn copy<'a>(
		&self,
		source: impl Into<Option<&'a str>>,
		destination: impl Into<Option<&'a str>>,
		overwrite: bool,
	) -> FsResult<()> {
		let (dst_id, data, src, dst, src_handle, dst_handle) = {
			let start = self.now();
			let mut state = self.shared.lock();
			let src = state.resolve(source.into(), "sourceFileName")?;
			let dst = state.resolve(destination.into(), "destFileName")?;
			check_reserved(&dst)?;

			let src_id = state.existing_file(&src)?;
			state.locks.ensure_no_writer(&src)?;
			if src.same_entry(&dst) {
				return Err(if overwrite {
					FsError::InUse {
						path: src.to_string(),
					}
				} else {
					FsError::FileExists {
						path: dst.to_string(),
					}
				});
			}
			if dst.is_root() {
				return Err(FsError::AccessDenied {
					path: dst.to_string(),
				});
			}
			let dst_parent = state.store.find_parent(&dst)?;

			let source_node = state.node(src_id, &src)?;
			let data = source_node.data().cloned().unwrap_or_default();
			let attributes = source_node.attributes;
			let times = FileTimes {
				created: start,
				last_write: source_node.times.last_write,
				last_access: start,
			};

			let name = dst.file_name().unwrap_or_default();
			let existing = state.store.child(dst_parent, name);
			if let Some(existing) = existing {
				let node = state.node(existing, &dst)?;
				if node.is_directory() {
					return Err(FsError::AccessDenied {
						path: dst.to_string(),
					});
				}
				if !overwrite {
					return Err(FsError::FileExists {
						path: dst.to_string(),
					});
				}
				if node.is_read_only() {
					return Err(FsError::AccessDenied {
						path: dst.to_string(),
					});
				}
				state.locks.ensure_unlocked(&dst)?;
			}

			let src_handle = state.locks.acquire(&src, FileAccess::Read, false)?;
			let dst_handle = match state.locks.acquire(&dst, FileAccess::Write, false) {
				Ok(handle) => handle,
				Err(err) => {
					state.locks.release(&src.key(), src_handle);
					return Err(err);
				}
			};

			let dst_id = match existing {
				Some(existing) => {
					if let Some(node) = state.store.node_mut(existing) {
						if let Some(bytes) = node.data_mut() {
							bytes.clear();
						}
						node.attributes = attributes;
						node.times = times;
					}
					existing
				}
				None => state.store.insert_file(dst_parent, name, attributes, times),
			};
			(dst_id, data, src, dst, src_handle, dst_handle)
		};

		tracing::debug!(src = %src, dst = %dst, bytes = data.len(), "copy started");
		self.shared.copy_sync.on_copy_started();
		self.shared.copy_sync.wait_for_release();

		let finish = self.now();
		let mut state = self.shared.lock();
		state.locks.release(&src.key(), src_handle);
		state.locks.release(&dst.key(), dst_handle);
		let node = state.node_mut(dst_id, &dst)?;
		if let Some(bytes) = node.data_mut() {
			*bytes = data;
		}
		node.times.last_access = finish;
		if let Some(src_id) = state.store.find_file(&src) {
			if let Some(source_node) = state.store.node_mut(src_id) {
				source_node.times.last_access = finish;
			}
		}
		tracing::debug!(src = %src, dst = %dst, "copy finished");
		Ok(())
	}

	// -- Replace ----------------------------------------------------------

	/// Put `source` in place of `destination`, optionally keeping the
	/// replaced file at `backup`. Every check runs before the first mutation.
	pub fn replace<'a>(
		&self,
		source: impl Into<Option<&'a str>>,
		destination: impl Into<Option<&'a str>>,
		backup: Option<&str>,
	) -> FsResult<()> {
		let mut state = self.shared.lock();
		let src = state.resolve(source.into(), "sourceFileName")?;
		let dst = state.resolve(destination.into(), "destinationFileName")?;
		let backup = backup
			.map(|b| state.resolve(Some(b), "destinationBackupFileName"))
			.transpose()?;

		if src.same_entry(&dst) {
			return Err(FsError::InUse {
				path: src.to_string(),
			});
		}
		if let Some(backup) = &backup {
			if backup.same_entry(&src) {
				return Err(FsError::ReplaceRemoveFailed {
					path: src.to_string(),
				});
			}
			if backup.same_entry(&dst) {
				return Err(FsError::ReplaceMoveFailed {
					path: dst.to_string(),
				});
			}
			check_reserved(backup)?;
		}

		let src_id = state.existing_file(&src)?;
		let dst_id = state.existing_file(&dst)?;
		if state.node(dst_id, &dst)?.is_read_only() {
			return Err(FsError::AccessDenied {
				path: dst.to_string(),
			});
		}
		state.locks.ensure_unlocked(&src)?;
		state.locks.ensure_unlocked(&dst)?;

		let previous_backup = match &backup {
			Some(backup) => {
				if backup.is_root() {
					return Err(FsError::AccessDenied {
						path: backup.to_string(),
					});
				}
				let parent = state.store.find_parent(backup)?;
				match state.store.child(parent, backup.file_name().unwrap_or_default()) {
					Some(id) => {
						let node = state.node(id, backup)?;
						if node.is_directory() || node.is_read_only() {
							return Err(FsError::AccessDenied {
								path: backup.to_string(),
							});
						}
						state.locks.ensure_unlocked(backup)?;
						Some(id)
					}
					None => None,
				}
			}
			None => None,
		};

		// Make room: drop the previous backup, or the destination itself
		// when no backup is kept.
		match &backup {
			Some(_) => {
				if let Some(old) = previous_backup {
					state.store.remove(old);
				}
			}
			None => {
				state.store.remove(dst_id);
			}
		}
		if let Some(backup) = &backup {
			state.store.reparent(dst_id, backup)?;
		}
		state.store.reparent(src_id, &dst)?;

		tracing::debug!(src = %src, dst = %dst, backup = ?backup.as_ref().map(ToString::to_string), "replace");
		Ok(())
	}

	// -- Encryption -------------------------------------------------------

	pub fn encrypt<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<()> {
		self.set_encrypted(path.into(), true)
	}

	pub fn decrypt<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<()> {
		self.set_encrypted(path.into(), false)
	}

	fn set_encrypted(&self, path: Option<&str>, encrypted: bool) -> FsResult<()> {
		let mut state = self.shared.lock();
		let path = state.resolve(path, "path")?;
		let id = state.entry(&path)?;
		let format = state.store.volume_format(path.root()).unwrap_or_default();
		if !supports_encryption(format) {
			return Err(FsError::EncryptionNotSupported);
		}
		if !encrypted {
			if state.node(id, &path)?.is_read_only() {
				return Err(FsError::AccessDenied {
					path: path.to_string(),
				});
			}
			state.locks.ensure_unlocked(&path)?;
		}
		let node = state.node_mut(id, &path)?;
		node.attributes.set(FileAttributes::ENCRYPTED, encrypted);
		Ok(())
	}

	// -- Attributes -------------------------------------------------------

	pub fn get_attributes<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<FileAttributes> {
		let state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		let id = state.entry(&path)?;
		Ok(state.node(id, &path)?.attributes)
	}

	/// Replace the attribute set. Directories always keep `DIRECTORY`; a file
	/// given no flags becomes `NORMAL`. Timestamps are untouched.
	pub fn set_attributes<'a>(
		&self,
		path: impl Into<Option<&'a str>>,
		attributes: FileAttributes,
	) -> FsResult<()> {
		let mut state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		let id = state.entry(&path)?;
		let node = state.node_mut(id, &path)?;
		node.attributes = if node.is_directory() {
			attributes | FileAttributes::DIRECTORY
		} else {
			normalize_file_attributes(attributes)
		};
		Ok(())
	}

	// -- Timestamps -------------------------------------------------------

	pub fn times<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<FileTimes> {
		let state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		let id = state.entry(&path)?;
		Ok(state.node(id, &path)?.times)
	}

	pub fn creation_time<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<DateTime<Utc>> {
		Ok(self.times(path)?.created)
	}

	pub fn last_write_time<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<DateTime<Utc>> {
		Ok(self.times(path)?.last_write)
	}

	pub fn last_access_time<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<DateTime<Utc>> {
		Ok(self.times(path)?.last_access)
	}

	pub fn set_creation_time<'a>(
		&self,
		path: impl Into<Option<&'a str>>,
		time: DateTime<Utc>,
	) -> FsResult<()> {
		self.update_times(path.into(), |t| t.created = time)
	}

	pub fn set_last_write_time<'a>(
		&self,
		path: impl Into<Option<&'a str>>,
		time: DateTime<Utc>,
	) -> FsResult<()> {
		self.update_times(path.into(), |t| t.last_write = time)
	}

	pub fn set_last_access_time<'a>(
		&self,
		path: impl Into<Option<&'a str>>,
		time: DateTime<Utc>,
	) -> FsResult<()> {
		self.update_times(path.into(), |t| t.last_access = time)
	}

	fn update_times(&self, path: Option<&str>, apply: impl FnOnce(&mut FileTimes)) -> FsResult<()> {
		let mut state = self.shared.lock();
		let path = state.resolve(path, "path")?;
		let id = state.entry(&path)?;
		apply(&mut state.node_mut(id, &path)?.times);
		Ok(())
	}

	// -- Directories ------------------------------------------------------

	/// Create `path` and any missing parents. Drive letters are mounted on
	/// demand; UNC shares must have been added.
	pub fn create_directory<'a>(&self, path: impl Into<Option<&'a str>>) -> FsResult<()> {
		let now = self.now();
		let mut state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		check_reserved(&path)?;
		if let Root::Drive(_) = path.root() {
			let format = state.drive_format.clone();
			state.store.mount(path.root(), &format, now);
		}
		state.store.ensure_directory(&path, now)?;
		tracing::debug!(path = %path, "create directory");
		Ok(())
	}

	pub fn delete_directory<'a>(
		&self,
		path: impl Into<Option<&'a str>>,
		recursive: bool,
	) -> FsResult<()> {
		let mut state = self.shared.lock();
		let path = state.resolve(path.into(), "path")?;
		let id = match state.store.find(&path) {
			Some(id) if state.store.node(id).is_some_and(Node::is_directory) => id,
			Some(_) => {
				return Err(FsError::DirectoryNameInvalid {
					path: path.to_string(),
				})
			}
			None => {
				return Err(FsError::DirectoryNotFound {
					path: path.to_string(),
				})
			}
		};
		if path.is_root() || state.node(id, &path)?.is_read_only() {
			return Err(FsError::AccessDenied {
				path: path.to_string(),
			});
		}
		if !recursive && state.store.has_children(id) {
			return Err(FsError::DirectoryNotEmpty {
				path: path.to_string(),
			});
		}
		state.locks.ensure_tree_unlocked(&path)?;
		state.store.remove(id);
		tracing::debug!(path = %path, recursive, "delete directory");
		Ok(())
	}

	/// Relocate a directory (with its subtree) on the same volume. A
	/// case-only rename is allowed.
	pub fn move_directory<'a>(
		&self,
		source: impl Into<Option<&'a str>>,
		destination: impl Into<Option<&'a str>>,
	) -> FsResult<()> {
		let mut state = self.shared.lock();
		let src = state.resolve(source.into(), "sourceDirName")?;
		let dst = state.resolve(destination.into(), "destDirName")?;
		check_reserved(&dst)?;

		if src.to_string() == dst.to_string() {
			return Err(FsError::SameSourceAndDestination);
		}
		let src_id = state
			.store
			.find(&src)
			.ok_or_else(|| FsError::DirectoryNotFound {
				path: src.to_string(),
			})?;
		if src.is_root() {
			return Err(FsError::AccessDenied {
				path: src.to_string(),
			});
		}
		if dst.is_root() {
			return Err(FsError::AccessDenied {
				path: dst.to_string(),
			});
		}
		if src.root().key() != dst.root().key() {
			return Err(FsError::CrossVolumeMove);
		}
		if dst.is_descendant_of(&src) {
			return Err(FsError::MoveIntoSubdirectory {
				path: dst.to_string(),
			});
		}
		let dst_parent = state.store.find_parent(&dst)?;
		if !src.same_entry(&dst)
			&& state
				.store
				.child(dst_parent, dst.file_name().unwrap_or_default())
				.is_some()
		{
			return Err(FsError::EntryExists {
				path: dst.to_string(),
			});
		}
		state.locks.ensure_tree_unlocked(&src)?;
		state.store.reparent(src_id, &dst)?;
		tracing::debug!(src = %src, dst = %dst, "move directory");
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::error::ErrorKind;
	use chrono::{Duration, TimeZone};

	fn t0() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
	}

	fn clocked() -> (MockFileSystem, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::new(t0()));
		let fs = MockFileSystem::with_options(
			MockFileSystemOptions::default().with_clock(clock.clone()),
		)
		.unwrap();
		(fs, clock)
	}

	fn fs_with(files: &[(&str, &str)]) -> MockFileSystem {
		let fs = MockFileSystem::new();
		for (path, text) in files {
			if let Some((dir, _)) = path.rsplit_once('\\') {
				fs.create_directory(dir).unwrap();
			}
			fs.write_all_text(*path, text).unwrap();
		}
		fs
	}

	// -- construction --

	#[test]
	fn starts_with_c_drive() {
		let fs = MockFileSystem::new();
		assert_eq!(fs.current_directory(), r"C:\");
		assert_eq!(fs.drives(), vec![r"C:\".to_string()]);
		assert_eq!(fs.drive_format(r"C:\x").unwrap(), "NTFS");
	}

	#[test]
	fn configured_current_directory_is_created() {
		let fs = MockFileSystem::with_options(
			MockFileSystemOptions::default().with_current_directory(r"D:\work\area"),
		)
		.unwrap();
		assert_eq!(fs.current_directory(), r"D:\work\area");
		assert!(fs.directory_exists(r"D:\work"));
		fs.write_all_text("rel.txt", "x").unwrap();
		assert!(fs.exists(r"D:\work\area\rel.txt"));
	}

	// -- open matrix --

	#[test]
	fn create_new_fails_on_existing() {
		let fs = fs_with(&[(r"C:\a.txt", "x")]);
		let err = fs
			.open(r"C:\a.txt", OpenOptions::new(FileMode::CreateNew))
			.unwrap_err();
		assert_eq!(err.to_string(), r"The file 'C:\a.txt' already exists.");
	}

	#[test]
	fn open_missing_fails() {
		let fs = MockFileSystem::new();
		let err = fs
			.open(r"C:\nope.txt", OpenOptions::new(FileMode::Open))
			.unwrap_err();
		assert_eq!(err.to_string(), r"Could not find file 'C:\nope.txt'.");
		let err = fs
			.open(r"C:\nope.txt", OpenOptions::new(FileMode::Truncate))
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::FileNotFound);
	}

	#[test]
	fn open_or_create_and_append_create_missing() {
		let fs = MockFileSystem::new();
		fs.open(r"C:\a.txt", OpenOptions::new(FileMode::OpenOrCreate))
			.unwrap();
		fs.append_all_text(r"C:\b.txt", "tail").unwrap();
		assert!(fs.exists(r"C:\a.txt"));
		assert_eq!(fs.read_all_text(r"C:\b.txt").unwrap(), "tail");
	}

	#[test]
	fn truncate_keeps_read_write() {
		let fs = fs_with(&[(r"C:\a.txt", "content")]);
		let mut s = fs
			.open(r"C:\a.txt", OpenOptions::new(FileMode::Truncate))
			.unwrap();
		assert_eq!(s.length().unwrap(), 0);
		assert!(s.can_read());
		assert!(s.can_write());
		s.write(b"new").unwrap();
	}

	#[test]
	fn open_directory_is_access_denied() {
		let fs = MockFileSystem::new();
		fs.create_directory(r"C:\dir").unwrap();
		let err = fs
			.open(r"C:\dir", OpenOptions::new(FileMode::Open))
			.unwrap_err();
		assert_eq!(err.to_string(), r"Access to the path 'C:\dir' is denied.");
	}

	#[test]
	fn open_with_missing_parent() {
		let fs = MockFileSystem::new();
		let err = fs.create_file(r"C:\no\such\f.txt").unwrap_err();
		assert_eq!(
			err.to_string(),
			r"Could not find a part of the path 'C:\no\such\f.txt'."
		);
	}

	#[test]
	fn read_only_file_rejects_write_access() {
		let fs = fs_with(&[(r"C:\ro.txt", "x")]);
		fs.set_attributes(r"C:\ro.txt", FileAttributes::READ_ONLY)
			.unwrap();
		assert_eq!(
			fs.open(r"C:\ro.txt", OpenOptions::new(FileMode::Open))
				.unwrap_err()
				.kind(),
			ErrorKind::AccessDenied
		);
		assert!(fs
			.open(r"C:\ro.txt", OpenOptions::new(FileMode::Open).access(FileAccess::Read))
			.is_ok());
	}

	#[test]
	fn reserved_names_rejected_on_create() {
		let fs = MockFileSystem::new();
		let err = fs.create_file(r"C:\CON").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::PlatformNotSupported);
		let err = fs.create_directory(r"C:\dir\nul").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::PlatformNotSupported);
		assert!(!fs.exists(r"C:\CON"));
		fs.delete(r"C:\CON").unwrap();
	}

	#[test]
	fn create_keeps_creation_time() {
		let (fs, clock) = clocked();
		fs.write_all_text(r"C:\f.txt", "one").unwrap();
		let later = clock.advance(Duration::minutes(5));
		fs.create_file(r"C:\f.txt").unwrap();

		let times = fs.times(r"C:\f.txt").unwrap();
		assert_eq!(times.created, t0());
		assert_eq!(times.last_write, later);
		assert_eq!(times.last_access, later);
	}

	// -- delete --

	#[test]
	fn delete_rules() {
		let fs = fs_with(&[(r"C:\dir\f.txt", "x")]);
		fs.delete(r"C:\dir\missing.txt").unwrap();
		assert_eq!(
			fs.delete(r"C:\nodir\f.txt").unwrap_err().kind(),
			ErrorKind::DirectoryNotFound
		);
		assert_eq!(fs.delete(r"C:\dir").unwrap_err().kind(), ErrorKind::AccessDenied);
		assert_eq!(fs.delete(r"C:\").unwrap_err().kind(), ErrorKind::AccessDenied);

		fs.delete(r"C:\DIR\F.TXT").unwrap();
		assert!(!fs.exists(r"C:\dir\f.txt"));
	}

	#[test]
	fn delete_read_only_denied() {
		let fs = fs_with(&[(r"C:\f.txt", "x")]);
		fs.set_attributes(r"C:\f.txt", FileAttributes::READ_ONLY)
			.unwrap();
		assert_eq!(fs.delete(r"C:\f.txt").unwrap_err().kind(), ErrorKind::AccessDenied);
	}

	#[test]
	fn delete_open_file_in_use() {
		let fs = fs_with(&[(r"C:\f.txt", "x")]);
		let _s = fs
			.open(r"C:\f.txt", OpenOptions::new(FileMode::Open).access(FileAccess::Read))
			.unwrap();
		let err = fs.delete(r"C:\f.txt").unwrap_err();
		assert_eq!(
			err.to_string(),
			r"The process cannot access the file 'C:\f.txt' because it is being used by another process."
		);
	}

	// -- move --

	#[test]
	fn move_errors() {
		let fs = fs_with(&[(r"C:\a.txt", "a"), (r"C:\b.txt", "b")]);
		assert_eq!(
			fs.move_file(r"C:\a.txt", r"C:\b.txt").unwrap_err().to_string(),
			"Cannot create a file when that file already exists."
		);
		assert_eq!(
			fs.move_file(r"C:\zzz.txt", r"C:\c.txt").unwrap_err().to_string(),
			r"Could not find file 'C:\zzz.txt'."
		);
		assert_eq!(
			fs.move_file(r"C:\a.txt", r"C:\nodir\c.txt").unwrap_err().kind(),
			ErrorKind::DirectoryNotFound
		);
		assert_eq!(
			fs.move_file(None::<&str>, r"C:\c.txt").unwrap_err(),
			FsError::ArgumentNull { param: "sourceFileName" }
		);
	}

	#[test]
	fn move_overwrite_replaces_destination() {
		let fs = fs_with(&[(r"C:\a.txt", "a"), (r"C:\b.txt", "b")]);
		fs.move_file_overwrite(r"C:\a.txt", r"C:\b.txt").unwrap();
		assert!(!fs.exists(r"C:\a.txt"));
		assert_eq!(fs.read_all_text(r"C:\b.txt").unwrap(), "a");
	}

	#[test]
	fn move_to_same_path_with_new_casing_renames() {
		let fs = fs_with(&[(r"C:\name.txt", "x")]);
		fs.move_file(r"C:\name.txt", r"C:\NAME.TXT").unwrap();
		assert_eq!(fs.stored_path(r"c:\name.txt").unwrap(), r"C:\NAME.TXT");
	}

	#[test]
	fn move_open_file_in_use() {
		let fs = fs_with(&[(r"C:\a.txt", "a")]);
		let _s = fs.open(r"C:\a.txt", OpenOptions::new(FileMode::Open)).unwrap();
		assert_eq!(
			fs.move_file(r"C:\a.txt", r"C:\b.txt").unwrap_err().kind(),
			ErrorKind::InUse
		);
	}

	#[test]
	fn move_across_drives() {
		let fs = fs_with(&[(r"C:\a.txt", "a")]);
		fs.create_directory(r"D:\").unwrap();
		fs.move_file(r"C:\a.txt", r"D:\a.txt").unwrap();
		assert_eq!(fs.read_all_text(r"D:\a.txt").unwrap(), "a");
	}

	// -- copy --

	#[test]
	fn copy_errors() {
		let fs = fs_with(&[(r"C:\a.txt", "a"), (r"C:\b.txt", "b")]);
		fs.create_directory(r"C:\dir").unwrap();
		assert_eq!(
			fs.copy(r"C:\a.txt", r"C:\b.txt", false).unwrap_err().to_string(),
			r"The file 'C:\b.txt' already exists."
		);
		assert_eq!(
			fs.copy(r"C:\missing", r"C:\c.txt", false).unwrap_err().kind(),
			ErrorKind::FileNotFound
		);
		assert_eq!(
			fs.copy(r"C:\dir", r"C:\c.txt", false).unwrap_err().kind(),
			ErrorKind::AccessDenied
		);
		assert_eq!(
			fs.copy(r"C:\a.txt", r"C:\dir", true).unwrap_err().kind(),
			ErrorKind::AccessDenied
		);
		assert_eq!(
			fs.copy(r"C:\a.txt", r"C:\A.TXT", true).unwrap_err().kind(),
			ErrorKind::InUse
		);
	}

	#[test]
	fn copy_overwrite_and_content() {
		let fs = fs_with(&[(r"C:\a.txt", "alpha"), (r"C:\b.txt", "b")]);
		fs.copy(r"C:\a.txt", r"C:\b.txt", true).unwrap();
		assert_eq!(fs.read_all_text(r"C:\b.txt").unwrap(), "alpha");
		assert_eq!(fs.read_all_text(r"C:\a.txt").unwrap(), "alpha");
	}

	#[test]
	fn copy_reads_past_reader_but_not_writer() {
		let fs = fs_with(&[(r"C:\a.txt", "alpha")]);
		{
			let _r = fs
				.open(r"C:\a.txt", OpenOptions::new(FileMode::Open).access(FileAccess::Read))
				.unwrap();
			fs.copy(r"C:\a.txt", r"C:\b.txt", false).unwrap();
		}
		let _w = fs.open(r"C:\a.txt", OpenOptions::new(FileMode::Open)).unwrap();
		assert_eq!(
			fs.copy(r"C:\a.txt", r"C:\c.txt", false).unwrap_err().kind(),
			ErrorKind::InUse
		);
	}

	#[test]
	fn copy_releases_its_handles() {
		let fs = fs_with(&[(r"C:\a.txt", "alpha"), (r"C:\b.txt", "b")]);
		fs.copy(r"C:\a.txt", r"C:\b.txt", true).unwrap();
		{
			let state = fs.shared.lock();
			let a = state.resolve(Some(r"C:\a.txt"), "path").unwrap();
			let b = state.resolve(Some(r"C:\b.txt"), "path").unwrap();
			assert_eq!(state.locks.open_count(&a), 0);
			assert_eq!(state.locks.open_count(&b), 0);
		}

		let reader = fs
			.open(r"C:\b.txt", OpenOptions::new(FileMode::Open).access(FileAccess::Read))
			.unwrap();
		assert_eq!(
			fs.copy(r"C:\a.txt", r"C:\b.txt", true).unwrap_err().kind(),
			ErrorKind::InUse
		);
		drop(reader);

		fs.delete(r"C:\a.txt").unwrap();
		fs.write_all_text(r"C:\b.txt", "rewritten").unwrap();
		assert_eq!(fs.read_all_text(r"C:\b.txt").unwrap(), "rewritten");
	}

	#[test]
	fn copy_timestamps_without_gate() {
		let (fs, clock) = clocked();
		fs.write_all_text(r"C:\src.txt", "data").unwrap();
		let start = clock.advance(Duration::hours(1));
		fs.copy(r"C:\src.txt", r"C:\dst.txt", false).unwrap();

		let dst = fs.times(r"C:\dst.txt").unwrap();
		assert_eq!(dst.created, start);
		assert_eq!(dst.last_write, t0());
		assert_eq!(dst.last_access, start);
		assert_eq!(fs.last_access_time(r"C:\src.txt").unwrap(), start);
	}

	// -- replace --

	#[test]
	fn replace_with_backup() {
		let fs = fs_with(&[
			(r"C:\new.txt", "new"),
			(r"C:\cur.txt", "cur"),
			(r"C:\bak.txt", "old backup"),
		]);
		fs.replace(r"C:\new.txt", r"C:\cur.txt", Some(r"C:\bak.txt"))
			.unwrap();
		assert!(!fs.exists(r"C:\new.txt"));
		assert_eq!(fs.read_all_text(r"C:\cur.txt").unwrap(), "new");
		assert_eq!(fs.read_all_text(r"C:\bak.txt").unwrap(), "cur");
	}

	#[test]
	fn replace_without_backup() {
		let fs = fs_with(&[(r"C:\new.txt", "new"), (r"C:\cur.txt", "cur")]);
		fs.replace(r"C:\new.txt", r"C:\cur.txt", None).unwrap();
		assert!(!fs.exists(r"C:\new.txt"));
		assert_eq!(fs.read_all_text(r"C:\cur.txt").unwrap(), "new");
	}

	#[test]
	fn replace_collisions() {
		let fs = fs_with(&[(r"C:\new.txt", "new"), (r"C:\cur.txt", "cur")]);
		assert_eq!(
			fs.replace(r"C:\new.txt", r"C:\NEW.txt", None).unwrap_err().kind(),
			ErrorKind::InUse
		);
		assert_eq!(
			fs.replace(r"C:\new.txt", r"C:\cur.txt", Some(r"c:\new.txt"))
				.unwrap_err()
				.to_string(),
			"Unable to remove the file to be replaced."
		);
		assert_eq!(fs.read_all_text(r"C:\new.txt").unwrap(), "new");
		assert_eq!(fs.read_all_text(r"C:\cur.txt").unwrap(), "cur");
	}

	#[test]
	fn replace_missing_files() {
		let fs = fs_with(&[(r"C:\cur.txt", "cur")]);
		assert_eq!(
			fs.replace(r"C:\new.txt", r"C:\cur.txt", None).unwrap_err().kind(),
			ErrorKind::FileNotFound
		);
		assert_eq!(
			fs.replace(r"C:\cur.txt", r"C:\gone.txt", None).unwrap_err().kind(),
			ErrorKind::FileNotFound
		);
		assert!(fs.exists(r"C:\cur.txt"));
	}

	// -- encryption and attributes --

	#[test]
	fn encrypt_and_decrypt_toggle_flag_only() {
		let (fs, clock) = clocked();
		fs.write_all_text(r"C:\f.txt", "x").unwrap();
		let before = fs.times(r"C:\f.txt").unwrap();
		clock.advance(Duration::minutes(1));

		fs.encrypt(r"C:\f.txt").unwrap();
		assert!(fs
			.get_attributes(r"C:\f.txt")
			.unwrap()
			.contains(FileAttributes::ENCRYPTED));
		fs.decrypt(r"C:\f.txt").unwrap();
		assert!(!fs
			.get_attributes(r"C:\f.txt")
			.unwrap()
			.contains(FileAttributes::ENCRYPTED));
		assert_eq!(fs.times(r"C:\f.txt").unwrap(), before);
	}

	#[test]
	fn decrypt_read_only_denied_and_open_in_use() {
		let fs = fs_with(&[(r"C:\f.txt", "x")]);
		fs.encrypt(r"C:\f.txt").unwrap();
		{
			let _s = fs
				.open(r"C:\f.txt", OpenOptions::new(FileMode::Open).access(FileAccess::Read))
				.unwrap();
			assert_eq!(fs.decrypt(r"C:\f.txt").unwrap_err().kind(), ErrorKind::InUse);
		}
		fs.set_attributes(r"C:\f.txt", FileAttributes::READ_ONLY | FileAttributes::ENCRYPTED)
			.unwrap();
		assert_eq!(fs.decrypt(r"C:\f.txt").unwrap_err().kind(), ErrorKind::AccessDenied);
	}

	#[test]
	fn fat_volume_rejects_encryption() {
		let fs = MockFileSystem::new();
		fs.add_drive("F:", "FAT16").unwrap();
		fs.write_all_text(r"F:\f.txt", "x").unwrap();
		assert_eq!(fs.encrypt(r"F:\f.txt").unwrap_err(), FsError::EncryptionNotSupported);
		assert_eq!(fs.decrypt(r"F:\f.txt").unwrap_err(), FsError::EncryptionNotSupported);
	}

	#[test]
	fn set_attributes_normalizes() {
		let fs = fs_with(&[(r"C:\f.txt", "x")]);
		fs.create_directory(r"C:\d").unwrap();

		fs.set_attributes(r"C:\f.txt", FileAttributes::empty()).unwrap();
		assert_eq!(fs.get_attributes(r"C:\f.txt").unwrap(), FileAttributes::NORMAL);
		fs.set_attributes(r"C:\f.txt", FileAttributes::NORMAL | FileAttributes::HIDDEN)
			.unwrap();
		assert_eq!(fs.get_attributes(r"C:\f.txt").unwrap(), FileAttributes::HIDDEN);

		fs.set_attributes(r"C:\d", FileAttributes::HIDDEN).unwrap();
		assert_eq!(
			fs.get_attributes(r"C:\d").unwrap(),
			FileAttributes::HIDDEN | FileAttributes::DIRECTORY
		);
	}

	#[test]
	fn attributes_of_missing_entries() {
		let fs = MockFileSystem::new();
		assert_eq!(
			fs.get_attributes(r"C:\nope.txt").unwrap_err().kind(),
			ErrorKind::FileNotFound
		);
		assert_eq!(
			fs.get_attributes(r"C:\nodir\nope.txt").unwrap_err().kind(),
			ErrorKind::DirectoryNotFound
		);
	}

	#[test]
	fn explicit_time_setters() {
		let fs = fs_with(&[(r"C:\f.txt", "x")]);
		let when = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
		fs.set_creation_time(r"C:\f.txt", when).unwrap();
		fs.set_last_write_time(r"C:\f.txt", when).unwrap();
		fs.set_last_access_time(r"C:\f.txt", when).unwrap();
		assert_eq!(fs.creation_time(r"C:\f.txt").unwrap(), when);
		assert_eq!(fs.last_write_time(r"C:\f.txt").unwrap(), when);
		assert_eq!(fs.last_access_time(r"C:\f.txt").unwrap(), when);
	}

	// -- directories --

	#[test]
	fn create_directory_blocked_by_file() {
		let fs = fs_with(&[(r"C:\f", "x")]);
		let err = fs.create_directory(r"C:\f\sub").unwrap_err();
		assert_eq!(
			err.to_string(),
			r"Cannot create 'C:\f\sub' because a file or directory with the same name already exists."
		);
	}

	#[test]
	fn delete_directory_rules() {
		let fs = fs_with(&[(r"C:\d\f.txt", "x")]);
		assert_eq!(
			fs.delete_directory(r"C:\d", false).unwrap_err().to_string(),
			r"The directory is not empty. : 'C:\d'"
		);
		assert_eq!(
			fs.delete_directory(r"C:\missing", false).unwrap_err().kind(),
			ErrorKind::DirectoryNotFound
		);
		assert_eq!(
			fs.delete_directory(r"C:\", true).unwrap_err().kind(),
			ErrorKind::AccessDenied
		);
		{
			let _s = fs
				.open(r"C:\d\f.txt", OpenOptions::new(FileMode::Open).access(FileAccess::Read))
				.unwrap();
			assert_eq!(
				fs.delete_directory(r"C:\d", true).unwrap_err().kind(),
				ErrorKind::InUse
			);
		}
		fs.delete_directory(r"C:\d", true).unwrap();
		assert!(!fs.directory_exists(r"C:\d"));
		assert!(!fs.exists(r"C:\d\f.txt"));
	}

	#[test]
	fn move_directory_rules() {
		let fs = fs_with(&[(r"C:\a\f.txt", "x")]);
		fs.create_directory(r"C:\b").unwrap();
		assert_eq!(
			fs.move_directory(r"C:\a", r"C:\a").unwrap_err(),
			FsError::SameSourceAndDestination
		);
		assert_eq!(
			fs.move_directory(r"C:\a", r"C:\a\inner").unwrap_err().kind(),
			ErrorKind::Io
		);
		assert_eq!(
			fs.move_directory(r"C:\a", r"C:\b").unwrap_err().kind(),
			ErrorKind::AlreadyExists
		);
		assert_eq!(
			fs.move_directory(r"C:\a", r"D:\a").unwrap_err(),
			FsError::CrossVolumeMove
		);

		fs.move_directory(r"C:\a", r"C:\b\moved").unwrap();
		assert_eq!(fs.read_all_text(r"C:\b\moved\f.txt").unwrap(), "x");
		assert!(!fs.directory_exists(r"C:\a"));
	}

	#[test]
	fn set_current_directory_requires_directory() {
		let fs = fs_with(&[(r"C:\f.txt", "x")]);
		assert_eq!(
			fs.set_current_directory(r"C:\f.txt").unwrap_err().kind(),
			ErrorKind::DirectoryNotFound
		);
		fs.create_directory(r"C:\work").unwrap();
		fs.set_current_directory(r"C:\work").unwrap();
		assert_eq!(fs.full_path("x.txt").unwrap(), r"C:\work\x.txt");
	}

	#[test]
	fn unc_share_must_be_added() {
		let fs = MockFileSystem::new();
		assert!(fs.create_directory(r"\\srv\share\dir").is_err());
		assert!(!fs.exists(r"\\srv\share\f.txt"));

		fs.add_share(r"\\srv\share").unwrap();
		fs.write_all_text(r"\\srv\share\f.txt", "remote").unwrap();
		assert!(fs.exists(r"\\SRV\Share\F.TXT"));
	}

	#[test]
	fn file_length_query() {
		let fs = fs_with(&[(r"C:\f.txt", "12345")]);
		fs.create_directory(r"C:\d").unwrap();
		assert_eq!(fs.file_length(r"C:\f.txt").unwrap(), 5);
		assert_eq!(fs.file_length(r"C:\d").unwrap_err().kind(), ErrorKind::FileNotFound);
	}
}
