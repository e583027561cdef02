// ---------------------------------------------------------------------------
// Entry store — arena-backed directory tree plus the volume table
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::error::{FsError, FsResult};
use crate::path::{ResolvedPath, Root};

// ---------------------------------------------------------------------------
// Public node metadata
// ---------------------------------------------------------------------------

bitflags! {
	/// Entry attribute flags, bit-compatible with the platform values.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct FileAttributes: u32 {
		const READ_ONLY = 0x0001;
		const HIDDEN = 0x0002;
		const SYSTEM = 0x0004;
		const DIRECTORY = 0x0010;
		const ARCHIVE = 0x0020;
		const DEVICE = 0x0040;
		const NORMAL = 0x0080;
		const TEMPORARY = 0x0100;
		const SPARSE_FILE = 0x0200;
		const REPARSE_POINT = 0x0400;
		const COMPRESSED = 0x0800;
		const OFFLINE = 0x1000;
		const NOT_CONTENT_INDEXED = 0x2000;
		const ENCRYPTED = 0x4000;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
	pub created: DateTime<Utc>,
	pub last_write: DateTime<Utc>,
	pub last_access: DateTime<Utc>,
}

impl FileTimes {
	pub fn at(now: DateTime<Utc>) -> Self {
		Self {
			created: now,
			last_write: now,
			last_access: now,
		}
	}
}

// ---------------------------------------------------------------------------
// Internal types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(u64);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
	File { data: Vec<u8> },
	/// Children keyed by case-folded name.
	Directory { children: BTreeMap<String, NodeId> },
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
	pub name: String,
	pub parent: Option<NodeId>,
	pub kind: NodeKind,
	pub attributes: FileAttributes,
	pub times: FileTimes,
}

impl Node {
	pub fn is_directory(&self) -> bool {
		matches!(self.kind, NodeKind::Directory { .. })
	}

	pub fn is_file(&self) -> bool {
		matches!(self.kind, NodeKind::File { .. })
	}

	pub fn is_read_only(&self) -> bool {
		self.attributes.contains(FileAttributes::READ_ONLY)
	}

	pub fn len(&self) -> u64 {
		match &self.kind {
			NodeKind::File { data } => data.len() as u64,
			NodeKind::Directory { .. } => 0,
		}
	}

	pub fn data(&self) -> Option<&Vec<u8>> {
		match &self.kind {
			NodeKind::File { data } => Some(data),
			NodeKind::Directory { .. } => None,
		}
	}

	pub fn data_mut(&mut self) -> Option<&mut Vec<u8>> {
		match &mut self.kind {
			NodeKind::File { data } => Some(data),
			NodeKind::Directory { .. } => None,
		}
	}

	fn has_children(&self) -> bool {
		match &self.kind {
			NodeKind::Directory { children } => !children.is_empty(),
			NodeKind::File { .. } => false,
		}
	}
}

#[derive(Debug, Clone)]
struct Volume {
	root: Root,
	node: NodeId,
	format: String,
}

fn fold(name: &str) -> String {
	name.to_lowercase()
}

// ---------------------------------------------------------------------------
// EntryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(crate) struct EntryStore {
	nodes: HashMap<NodeId, Node>,
	volumes: HashMap<String, Volume>,
	next_id: u64,
}

impl EntryStore {
	pub fn new() -> Self {
		Self::default()
	}

	// -- Volumes ----------------------------------------------------------

	/// Add a drive or UNC share. Mounting an existing root keeps its tree and
	/// returns the existing root node.
	pub fn mount(&mut self, root: &Root, format: &str, now: DateTime<Utc>) -> NodeId {
		let key = root.key();
		if let Some(volume) = self.volumes.get(&key) {
			return volume.node;
		}
		let id = self.allocate(Node {
			name: root.to_string(),
			parent: None,
			kind: NodeKind::Directory {
				children: BTreeMap::new(),
			},
			attributes: FileAttributes::DIRECTORY,
			times: FileTimes::at(now),
		});
		self.volumes.insert(
			key,
			Volume {
				root: root.clone(),
				node: id,
				format: format.to_string(),
			},
		);
		id
	}

	pub fn is_mounted(&self, root: &Root) -> bool {
		self.volumes.contains_key(&root.key())
	}

	pub fn volume_format(&self, root: &Root) -> Option<&str> {
		self.volumes.get(&root.key()).map(|v| v.format.as_str())
	}

	pub fn set_volume_format(&mut self, root: &Root, format: &str) -> bool {
		match self.volumes.get_mut(&root.key()) {
			Some(volume) => {
				volume.format = format.to_string();
				true
			}
			None => false,
		}
	}

	pub fn volume_roots(&self) -> Vec<Root> {
		let mut roots: Vec<Root> = self.volumes.values().map(|v| v.root.clone()).collect();
		roots.sort_by_key(Root::key);
		roots
	}

	pub fn is_volume_root(&self, id: NodeId) -> bool {
		self.volumes.values().any(|v| v.node == id)
	}

	// -- Lookup -----------------------------------------------------------

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(&id)
	}

	pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.get_mut(&id)
	}

	pub fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
		match &self.nodes.get(&dir)?.kind {
			NodeKind::Directory { children } => children.get(&fold(name)).copied(),
			NodeKind::File { .. } => None,
		}
	}

	/// Walk every segment of `path`. `None` when any step is missing or a
	/// non-final step is a file.
	pub fn find(&self, path: &ResolvedPath) -> Option<NodeId> {
		let mut current = self.volumes.get(&path.root().key())?.node;
		for seg in path.segments() {
			current = self.child(current, seg)?;
		}
		Some(current)
	}

	pub fn find_file(&self, path: &ResolvedPath) -> Option<NodeId> {
		self.find(path)
			.filter(|id| self.node(*id).is_some_and(Node::is_file))
	}

	pub fn find_directory(&self, path: &ResolvedPath) -> Option<NodeId> {
		self.find(path)
			.filter(|id| self.node(*id).is_some_and(Node::is_directory))
	}

	/// Resolve the directory that holds `path`'s final segment. Every
	/// intermediate segment must be an existing directory.
	pub fn find_parent(&self, path: &ResolvedPath) -> FsResult<NodeId> {
		let not_found = || FsError::DirectoryNotFound {
			path: path.to_string(),
		};
		let parent = path.parent().ok_or_else(not_found)?;
		self.find_directory(&parent).ok_or_else(not_found)
	}

	/// Rebuild the stored-casing path of a node.
	pub fn path_of(&self, id: NodeId) -> Option<ResolvedPath> {
		let mut names = Vec::new();
		let mut current = id;
		loop {
			let node = self.nodes.get(&current)?;
			match node.parent {
				Some(parent) => {
					names.push(node.name.clone());
					current = parent;
				}
				None => break,
			}
		}
		let volume = self.volumes.values().find(|v| v.node == current)?;
		let mut path = ResolvedPath::root_of(volume.root.clone());
		for name in names.iter().rev() {
			path = path.join(name);
		}
		Some(path)
	}

	pub fn has_children(&self, id: NodeId) -> bool {
		self.nodes.get(&id).is_some_and(Node::has_children)
	}

	/// All nodes beneath `id`, depth first, excluding `id` itself.
	pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut stack = vec![id];
		while let Some(current) = stack.pop() {
			if let Some(NodeKind::Directory { children }) = self.nodes.get(&current).map(|n| &n.kind) {
				for child in children.values() {
					out.push(*child);
					stack.push(*child);
				}
			}
		}
		out
	}

	// -- Mutation ---------------------------------------------------------

	fn allocate(&mut self, node: Node) -> NodeId {
		self.next_id += 1;
		let id = NodeId(self.next_id);
		self.nodes.insert(id, node);
		id
	}

	fn link(&mut self, parent: NodeId, name: &str, child: NodeId) {
		if let Some(NodeKind::Directory { children }) = self.nodes.get_mut(&parent).map(|n| &mut n.kind) {
			children.insert(fold(name), child);
		}
	}

	fn unlink(&mut self, parent: NodeId, name: &str) {
		if let Some(NodeKind::Directory { children }) = self.nodes.get_mut(&parent).map(|n| &mut n.kind) {
			children.remove(&fold(name));
		}
	}

	pub fn insert_file(
		&mut self,
		parent: NodeId,
		name: &str,
		attributes: FileAttributes,
		times: FileTimes,
	) -> NodeId {
		debug_assert!(self.child(parent, name).is_none());
		let id = self.allocate(Node {
			name: name.to_string(),
			parent: Some(parent),
			kind: NodeKind::File { data: Vec::new() },
			attributes: attributes - FileAttributes::DIRECTORY,
			times,
		});
		self.link(parent, name, id);
		id
	}

	pub fn insert_directory(&mut self, parent: NodeId, name: &str, times: FileTimes) -> NodeId {
		debug_assert!(self.child(parent, name).is_none());
		let id = self.allocate(Node {
			name: name.to_string(),
			parent: Some(parent),
			kind: NodeKind::Directory {
				children: BTreeMap::new(),
			},
			attributes: FileAttributes::DIRECTORY,
			times,
		});
		self.link(parent, name, id);
		id
	}

	/// Create every missing directory along `path`. Fails when a file sits
	/// where a directory is needed or the volume is not mounted.
	pub fn ensure_directory(&mut self, path: &ResolvedPath, now: DateTime<Utc>) -> FsResult<NodeId> {
		let mut current = self
			.volumes
			.get(&path.root().key())
			.map(|v| v.node)
			.ok_or_else(|| FsError::DirectoryNotFound {
				path: path.to_string(),
			})?;
		for seg in path.segments() {
			current = match self.child(current, seg) {
				Some(id) if self.nodes.get(&id).is_some_and(Node::is_directory) => id,
				Some(_) => {
					return Err(FsError::EntryExists {
						path: path.to_string(),
					})
				}
				None => self.insert_directory(current, seg, FileTimes::at(now)),
			};
		}
		Ok(current)
	}

	/// Detach and drop a node with its whole subtree. Volume roots are never
	/// removed.
	pub fn remove(&mut self, id: NodeId) -> Option<Node> {
		if self.is_volume_root(id) {
			return None;
		}
		for desc in self.descendants(id) {
			self.nodes.remove(&desc);
		}
		let node = self.nodes.remove(&id)?;
		if let Some(parent) = node.parent {
			self.unlink(parent, &node.name);
		}
		Some(node)
	}

	/// Relocate `id` to `dst`, keeping the node (and its timestamps) intact.
	/// The destination may only be occupied by `id` itself, which is how a
	/// case-only rename is expressed.
	pub fn reparent(&mut self, id: NodeId, dst: &ResolvedPath) -> FsResult<()> {
		if self.is_volume_root(id) {
			return Err(FsError::AccessDenied {
				path: dst.to_string(),
			});
		}
		let new_parent = self.find_parent(dst)?;
		let new_name = dst.file_name().ok_or_else(|| FsError::AccessDenied {
			path: dst.to_string(),
		})?;
		if let Some(existing) = self.child(new_parent, new_name) {
			if existing != id {
				return Err(FsError::MoveTargetExists {
					path: dst.to_string(),
				});
			}
		}

		let (old_parent, old_name) = match self.nodes.get(&id) {
			Some(node) => (node.parent, node.name.clone()),
			None => {
				return Err(FsError::FileNotFound {
					path: dst.to_string(),
				})
			}
		};
		if let Some(old_parent) = old_parent {
			self.unlink(old_parent, &old_name);
		}
		self.link(new_parent, new_name, id);
		if let Some(node) = self.nodes.get_mut(&id) {
			node.parent = Some(new_parent);
			node.name = new_name.to_string();
		}
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
