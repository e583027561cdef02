use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::FsError;

// ── Constants ───────────────────────────────────────────────────────────────

pub const EXTENDED_PREFIX: &str = r"\\?\";
const EXTENDED_UNC_MARKER: &str = r"UNC\";
const ILLEGAL_CHARS: &[char] = &['"', '<', '>', '|', '*', '?'];

fn is_separator(c: char) -> bool {
	c == '\\' || c == '/'
}

// ── Roots ───────────────────────────────────────────────────────────────────

/// Identity of a volume: a drive letter or a UNC server/share pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Root {
	Drive(char),
	Unc { server: String, share: String },
}

impl Root {
	/// Case-folded identity used as a lookup key.
	pub fn key(&self) -> String {
		match self {
			Self::Drive(letter) => format!("{}:", letter.to_ascii_lowercase()),
			Self::Unc { server, share } => {
				format!(r"\\{}\{}", server.to_lowercase(), share.to_lowercase())
			}
		}
	}
}

impl fmt::Display for Root {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Drive(letter) => write!(f, r"{}:\", letter),
			Self::Unc { server, share } => write!(f, r"\\{}\{}", server, share),
		}
	}
}

// ── Resolved paths ──────────────────────────────────────────────────────────

/// A fully qualified path: root identity plus the segments below it, with
/// `.`/`..` already applied. Segments keep the caller's casing.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
	root: Root,
	segments: Vec<String>,
	extended: bool,
}

impl ResolvedPath {
	pub fn root_of(root: Root) -> Self {
		Self {
			root,
			segments: Vec::new(),
			extended: false,
		}
	}

	pub fn drive_root(letter: char) -> Self {
		Self::root_of(Root::Drive(letter.to_ascii_uppercase()))
	}

	pub fn root(&self) -> &Root {
		&self.root
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	/// Whether the raw path carried the `\\?\` prefix.
	pub fn is_extended(&self) -> bool {
		self.extended
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn file_name(&self) -> Option<&str> {
		self.segments.last().map(String::as_str)
	}

	pub fn parent(&self) -> Option<ResolvedPath> {
		if self.segments.is_empty() {
			return None;
		}
		let mut parent = self.clone();
		parent.segments.pop();
		Some(parent)
	}

	pub fn root_path(&self) -> ResolvedPath {
		Self::root_of(self.root.clone())
	}

	pub fn join(&self, name: &str) -> ResolvedPath {
		let mut joined = self.clone();
		joined.segments.push(name.to_string());
		joined
	}

	/// Case-folded full path. Two paths are the same entry iff their keys match.
	pub fn key(&self) -> String {
		self.to_string().to_lowercase()
	}

	pub fn same_entry(&self, other: &ResolvedPath) -> bool {
		self.key() == other.key()
	}

	/// True when `self` lies strictly below `ancestor`.
	pub fn is_descendant_of(&self, ancestor: &ResolvedPath) -> bool {
		self.root.key() == ancestor.root.key()
			&& self.segments.len() > ancestor.segments.len()
			&& self
				.segments
				.iter()
				.zip(&ancestor.segments)
				.all(|(a, b)| a.to_lowercase() == b.to_lowercase())
	}

	/// First segment naming a reserved device (`CON`, `NUL`, `COM1`, ...).
	pub fn reserved_segment(&self) -> Option<&str> {
		self.segments
			.iter()
			.map(String::as_str)
			.find(|s| is_reserved_device_name(s))
	}

	fn push_segments(&mut self, rest: &str) {
		for seg in rest.split(is_separator) {
			match seg {
				"" | "." => continue,
				".." => {
					self.segments.pop();
				}
				_ => self.segments.push(seg.to_string()),
			}
		}
	}
}

impl fmt::Display for ResolvedPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.root {
			Root::Drive(_) => write!(f, "{}{}", self.root, self.segments.join(r"\")),
			Root::Unc { .. } => {
				write!(f, "{}", self.root)?;
				for seg in &self.segments {
					write!(f, r"\{}", seg)?;
				}
				Ok(())
			}
		}
	}
}

// ── Current-directory context ───────────────────────────────────────────────

/// The active current directory plus each drive's own current directory.
/// Drive-relative paths (`D:name`) resolve against the latter.
#[derive(Debug, Clone)]
pub struct PathContext {
	current: ResolvedPath,
	drive_dirs: HashMap<char, ResolvedPath>,
}

impl Default for PathContext {
	fn default() -> Self {
		Self::new(ResolvedPath::drive_root('C'))
	}
}

impl PathContext {
	pub fn new(current: ResolvedPath) -> Self {
		let mut ctx = Self {
			current: current.clone(),
			drive_dirs: HashMap::new(),
		};
		ctx.set_current(current);
		ctx
	}

	pub fn current(&self) -> &ResolvedPath {
		&self.current
	}

	pub fn drive_directory(&self, letter: char) -> ResolvedPath {
		let letter = letter.to_ascii_uppercase();
		self.drive_dirs
			.get(&letter)
			.cloned()
			.unwrap_or_else(|| ResolvedPath::drive_root(letter))
	}

	/// Make `dir` the active directory; a drive path also becomes that
	/// drive's remembered directory.
	pub fn set_current(&mut self, dir: ResolvedPath) {
		self.set_drive_directory(dir.clone());
		self.current = dir;
	}

	/// Update the remembered directory of `dir`'s drive without switching the
	/// active drive.
	pub fn set_drive_directory(&mut self, dir: ResolvedPath) {
		if let Root::Drive(letter) = dir.root {
			self.drive_dirs.insert(letter, dir);
		}
	}
}

// ── Normalization ───────────────────────────────────────────────────────────

/// Resolve a raw caller path against `ctx`.
///
/// `param` names the argument in null/empty errors. Reserved device names are
/// not rejected here; operations that create or open entries check them.
pub fn normalize(
	raw: Option<&str>,
	param: &'static str,
	ctx: &PathContext,
) -> Result<ResolvedPath, FsError> {
	let raw = raw.ok_or(FsError::ArgumentNull { param })?;
	if raw.is_empty() {
		return Err(FsError::EmptyPath { param });
	}
	let trimmed = raw.trim_end();
	if trimmed.is_empty() {
		return Err(FsError::NotLegalForm);
	}

	let (body, extended) = strip_extended_prefix(trimmed);
	if body.is_empty() {
		return Err(FsError::NotLegalForm);
	}
	if body.chars().any(|c| ILLEGAL_CHARS.contains(&c) || (c as u32) < 0x20) {
		return Err(FsError::IllegalCharacters);
	}
	let has_drive = has_drive_prefix(&body);
	for (i, c) in body.char_indices() {
		if c == ':' && !(i == 1 && has_drive) {
			return Err(FsError::UnsupportedFormat);
		}
	}

	let mut chars = body.chars();
	let starts_with_two_separators =
		matches!((chars.next(), chars.next()), (Some(a), Some(b)) if is_separator(a) && is_separator(b));

	let mut resolved = if starts_with_two_separators {
		let mut parts = body[2..].splitn(3, is_separator);
		let server = parts.next().unwrap_or_default();
		let share = parts.next().unwrap_or_default();
		if server.is_empty() || share.is_empty() {
			return Err(FsError::MalformedUnc);
		}
		let mut unc = ResolvedPath::root_of(Root::Unc {
			server: server.to_string(),
			share: share.to_string(),
		});
		unc.push_segments(parts.next().unwrap_or_default());
		unc
	} else if has_drive {
		let letter = body.as_bytes()[0].to_ascii_uppercase() as char;
		let rest = &body[2..];
		let mut base = if rest.starts_with(is_separator) {
			ResolvedPath::drive_root(letter)
		} else {
			ctx.drive_directory(letter)
		};
		base.push_segments(rest);
		base
	} else if body.starts_with(is_separator) {
		let mut base = ctx.current().root_path();
		base.push_segments(&body);
		base
	} else {
		let mut base = ctx.current().clone();
		base.push_segments(&body);
		base
	};

	resolved.extended = extended;
	Ok(resolved)
}

fn strip_extended_prefix(path: &str) -> (String, bool) {
	let normalized_prefix = path.get(..EXTENDED_PREFIX.len()).map(|p| p.replace('/', r"\"));
	if normalized_prefix.as_deref() != Some(EXTENDED_PREFIX) {
		return (path.to_string(), false);
	}
	let rest = &path[EXTENDED_PREFIX.len()..];
	let is_unc = rest
		.get(..EXTENDED_UNC_MARKER.len())
		.map(|m| m.replace('/', r"\").eq_ignore_ascii_case(EXTENDED_UNC_MARKER))
		.unwrap_or(false);
	if is_unc {
		(format!(r"\\{}", &rest[EXTENDED_UNC_MARKER.len()..]), true)
	} else {
		(rest.to_string(), true)
	}
}

fn has_drive_prefix(path: &str) -> bool {
	let bytes = path.as_bytes();
	bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// `CON`, `PRN`, `AUX`, `NUL`, `COM1`-`COM9` and `LPT1`-`LPT9`, with or
/// without an extension, in any casing.
pub fn is_reserved_device_name(name: &str) -> bool {
	static RESERVED: OnceLock<Regex> = OnceLock::new();
	let re = RESERVED.get_or_init(|| {
		Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])(\..*)?$")
			.expect("reserved device name pattern is valid")
	});
	re.is_match(name.trim_end())
}

// ── Tests ───────────────────────────────────────────────────────────────────
