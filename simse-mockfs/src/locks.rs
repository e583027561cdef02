use std::collections::HashMap;

use crate::error::{FsError, FsResult};
use crate::path::ResolvedPath;
use crate::stream::FileAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HandleId(u64);

#[derive(Debug, Clone)]
struct Registration {
	id: HandleId,
	access: FileAccess,
	delete_on_close: bool,
}

#[derive(Debug)]
struct Entry {
	path: ResolvedPath,
	handles: Vec<Registration>,
	delete_pending: bool,
}

/// What the caller must do after a handle is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Released {
	/// Other handles remain on the path.
	StillOpen,
	/// Last handle gone.
	Closed,
	/// Last handle gone and a delete-on-close handle was among them; the node
	/// must be removed now.
	Delete,
}

/// Open handles per canonical path.
///
/// Read-only handles share freely. A handle that can write excludes every
/// other handle on the same path.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
	entries: HashMap<String, Entry>,
	next_id: u64,
}

impl LockTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn acquire(
		&mut self,
		path: &ResolvedPath,
		access: FileAccess,
		delete_on_close: bool,
	) -> FsResult<HandleId> {
		let key = path.key();
		if let Some(entry) = self.entries.get(&key) {
			let compatible = access == FileAccess::Read
				&& entry.handles.iter().all(|h| h.access == FileAccess::Read);
			if !entry.handles.is_empty() && !compatible {
				return Err(FsError::InUse {
					path: path.to_string(),
				});
			}
		}

		self.next_id += 1;
		let id = HandleId(self.next_id);
		let entry = self.entries.entry(key).or_insert_with(|| Entry {
			path: path.clone(),
			handles: Vec::new(),
			delete_pending: false,
		});
		entry.handles.push(Registration {
			id,
			access,
			delete_on_close,
		});
		Ok(id)
	}

	pub fn release(&mut self, key: &str, id: HandleId) -> Released {
		let Some(entry) = self.entries.get_mut(key) else {
			return Released::Closed;
		};
		if let Some(pos) = entry.handles.iter().position(|h| h.id == id) {
			let reg = entry.handles.remove(pos);
			entry.delete_pending |= reg.delete_on_close;
		}
		if !entry.handles.is_empty() {
			return Released::StillOpen;
		}
		let delete = entry.delete_pending;
		self.entries.remove(key);
		if delete {
			Released::Delete
		} else {
			Released::Closed
		}
	}

	pub fn open_count(&self, path: &ResolvedPath) -> usize {
		self.entries
			.get(&path.key())
			.map_or(0, |e| e.handles.len())
	}

	/// Fail with `InUse` when any handle is open on `path`.
	pub fn ensure_unlocked(&self, path: &ResolvedPath) -> FsResult<()> {
		if self.open_count(path) > 0 {
			return Err(FsError::InUse {
				path: path.to_string(),
			});
		}
		Ok(())
	}

	/// Fail with `InUse` when a handle that can write is open on `path`.
	pub fn ensure_no_writer(&self, path: &ResolvedPath) -> FsResult<()> {
		let has_writer = self
			.entries
			.get(&path.key())
			.is_some_and(|e| e.handles.iter().any(|h| h.access.can_write()));
		if has_writer {
			return Err(FsError::InUse {
				path: path.to_string(),
			});
		}
		Ok(())
	}

	/// Fail with `InUse` when `dir` or anything beneath it has an open handle.
	pub fn ensure_tree_unlocked(&self, dir: &ResolvedPath) -> FsResult<()> {
		let busy = self
			.entries
			.values()
			.find(|e| e.path.same_entry(dir) || e.path.is_descendant_of(dir));
		match busy {
			Some(entry) => Err(FsError::InUse {
				path: entry.path.to_string(),
			}),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::path::{normalize, PathContext};

	fn p(raw: &str) -> ResolvedPath {
		normalize(Some(raw), "path", &PathContext::default()).unwrap()
	}

	#[test]
	fn readers_share() {
		let mut table = LockTable::new();
		let path = p(r"C:\f.txt");
		table.acquire(&path, FileAccess::Read, false).unwrap();
		table.acquire(&path, FileAccess::Read, false).unwrap();
		assert_eq!(table.open_count(&path), 2);
	}

	#[test]
	fn writer_excludes_everyone() {
		let mut table = LockTable::new();
		let path = p(r"C:\f.txt");
		table.acquire(&path, FileAccess::ReadWrite, false).unwrap();

		for access in [FileAccess::Read, FileAccess::Write, FileAccess::ReadWrite] {
			let err = table.acquire(&p(r"c:\F.TXT"), access, false).unwrap_err();
			assert_eq!(
				err,
				FsError::InUse {
					path: r"c:\F.TXT".into()
				}
			);
		}
	}

	#[test]
	fn writer_blocked_by_reader() {
		let mut table = LockTable::new();
		let path = p(r"C:\f.txt");
		table.acquire(&path, FileAccess::Read, false).unwrap();
		assert!(table.acquire(&path, FileAccess::Write, false).is_err());
	}

	#[test]
	fn release_frees_the_path() {
		let mut table = LockTable::new();
		let path = p(r"C:\f.txt");
		let id = table.acquire(&path, FileAccess::Write, false).unwrap();
		assert!(table.ensure_unlocked(&path).is_err());

		assert_eq!(table.release(&path.key(), id), Released::Closed);
		assert!(table.ensure_unlocked(&path).is_ok());
		table.acquire(&path, FileAccess::Write, false).unwrap();
	}

	#[test]
	fn delete_on_close_fires_on_last_release() {
		let mut table = LockTable::new();
		let path = p(r"C:\tmp.dat");
		let a = table.acquire(&path, FileAccess::Read, true).unwrap();
		let b = table.acquire(&path, FileAccess::Read, false).unwrap();

		assert_eq!(table.release(&path.key(), a), Released::StillOpen);
		assert_eq!(table.release(&path.key(), b), Released::Delete);
	}

	#[test]
	fn writer_check_ignores_readers() {
		let mut table = LockTable::new();
		let path = p(r"C:\f.txt");
		table.acquire(&path, FileAccess::Read, false).unwrap();
		assert!(table.ensure_no_writer(&path).is_ok());
		assert!(table.ensure_unlocked(&path).is_err());
	}

	#[test]
	fn tree_check_sees_nested_handles() {
		let mut table = LockTable::new();
		table
			.acquire(&p(r"C:\dir\sub\f.txt"), FileAccess::Read, false)
			.unwrap();
		let err = table.ensure_tree_unlocked(&p(r"C:\DIR")).unwrap_err();
		assert_eq!(
			err,
			FsError::InUse {
				path: r"C:\dir\sub\f.txt".into()
			}
		);
		assert!(table.ensure_tree_unlocked(&p(r"C:\other")).is_ok());
	}
}
