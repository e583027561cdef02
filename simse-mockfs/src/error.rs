use std::io;

use thiserror::Error;

use crate::stream::{FileAccess, FileMode};

pub type FsResult<T> = Result<T, FsError>;

/// Coarse failure category. Several `FsError` variants share a kind; callers
/// that only care about the category match on this instead of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	InvalidArgument,
	UnsupportedPathFormat,
	FileNotFound,
	DirectoryNotFound,
	AlreadyExists,
	AccessDenied,
	InUse,
	PlatformNotSupported,
	Disposed,
	UnsupportedStreamDirection,
	OutOfRange,
	Io,
}

/// Every failure the simulated filesystem can report.
///
/// The variant (plus the path it carries) is the error's identity; the
/// `Display` output reproduces the platform message text verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
	// ── Argument and path validation ────────────────────────────────────
	#[error("Value cannot be null. (Parameter '{param}')")]
	ArgumentNull { param: &'static str },
	#[error("The value cannot be an empty string. (Parameter '{param}')")]
	EmptyPath { param: &'static str },
	#[error("The path is not of a legal form.")]
	NotLegalForm,
	#[error("Illegal characters in path.")]
	IllegalCharacters,
	#[error("The UNC path should be of the form \\\\server\\share.")]
	MalformedUnc,
	#[error("The given path's format is not supported.")]
	UnsupportedFormat,
	#[error("Combining FileMode: {mode} with FileAccess: {access} is invalid.")]
	InvalidModeAccess { mode: FileMode, access: FileAccess },
	#[error("Append access can be requested only in write-only mode.")]
	AppendRequiresWriteOnly,

	// ── Lookup ──────────────────────────────────────────────────────────
	#[error("Could not find file '{path}'.")]
	FileNotFound { path: String },
	#[error("Could not find a part of the path '{path}'.")]
	DirectoryNotFound { path: String },

	// ── Conflicts ───────────────────────────────────────────────────────
	#[error("The file '{path}' already exists.")]
	FileExists { path: String },
	#[error("Cannot create a file when that file already exists.")]
	MoveTargetExists { path: String },
	#[error("Cannot create '{path}' because a file or directory with the same name already exists.")]
	EntryExists { path: String },
	#[error("Access to the path '{path}' is denied.")]
	AccessDenied { path: String },
	#[error("The process cannot access the file '{path}' because it is being used by another process.")]
	InUse { path: String },

	// ── Unsupported features ────────────────────────────────────────────
	#[error("Reserved device names are not supported: '{path}'.")]
	ReservedName { path: String },
	#[error("File encryption is not supported on this platform.")]
	EncryptionNotSupported,

	// ── Streams ─────────────────────────────────────────────────────────
	#[error("Cannot access a closed file.")]
	Disposed,
	#[error("Stream does not support reading.")]
	ReadNotSupported,
	#[error("Stream does not support writing.")]
	WriteNotSupported,
	#[error("An attempt was made to move the position before the beginning of the stream.")]
	SeekBeforeBegin,
	#[error("Stream was too long.")]
	StreamTooLong,

	// ── Directory and replace failures ──────────────────────────────────
	#[error("The directory is not empty. : '{path}'")]
	DirectoryNotEmpty { path: String },
	#[error("The directory name is invalid. : '{path}'")]
	DirectoryNameInvalid { path: String },
	#[error("Source and destination path must be different.")]
	SameSourceAndDestination,
	#[error("Source and destination path must have identical roots. Move will not work across volumes.")]
	CrossVolumeMove,
	#[error("Cannot move a directory into itself or one of its subdirectories: '{path}'.")]
	MoveIntoSubdirectory { path: String },
	#[error("Unable to remove the file to be replaced.")]
	ReplaceRemoveFailed { path: String },
	#[error("Unable to move the replacement file to the file to be replaced. The file to be replaced has retained its original name.")]
	ReplaceMoveFailed { path: String },
}

impl FsError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::ArgumentNull { .. }
			| Self::EmptyPath { .. }
			| Self::NotLegalForm
			| Self::IllegalCharacters
			| Self::MalformedUnc
			| Self::InvalidModeAccess { .. }
			| Self::AppendRequiresWriteOnly => ErrorKind::InvalidArgument,
			Self::UnsupportedFormat => ErrorKind::UnsupportedPathFormat,
			Self::FileNotFound { .. } => ErrorKind::FileNotFound,
			Self::DirectoryNotFound { .. } => ErrorKind::DirectoryNotFound,
			Self::FileExists { .. } | Self::MoveTargetExists { .. } | Self::EntryExists { .. } => {
				ErrorKind::AlreadyExists
			}
			Self::AccessDenied { .. } => ErrorKind::AccessDenied,
			Self::InUse { .. } => ErrorKind::InUse,
			Self::ReservedName { .. } | Self::EncryptionNotSupported => {
				ErrorKind::PlatformNotSupported
			}
			Self::Disposed => ErrorKind::Disposed,
			Self::ReadNotSupported | Self::WriteNotSupported => {
				ErrorKind::UnsupportedStreamDirection
			}
			Self::SeekBeforeBegin => ErrorKind::OutOfRange,
			Self::DirectoryNotEmpty { .. }
			| Self::DirectoryNameInvalid { .. }
			| Self::SameSourceAndDestination
			| Self::CrossVolumeMove
			| Self::MoveIntoSubdirectory { .. }
			| Self::StreamTooLong
			| Self::ReplaceRemoveFailed { .. }
			| Self::ReplaceMoveFailed { .. } => ErrorKind::Io,
		}
	}

	pub fn code(&self) -> &str {
		match self.kind() {
			ErrorKind::InvalidArgument => "MOCKFS_INVALID_ARGUMENT",
			ErrorKind::UnsupportedPathFormat => "MOCKFS_UNSUPPORTED_PATH_FORMAT",
			ErrorKind::FileNotFound => "MOCKFS_FILE_NOT_FOUND",
			ErrorKind::DirectoryNotFound => "MOCKFS_DIRECTORY_NOT_FOUND",
			ErrorKind::AlreadyExists => "MOCKFS_ALREADY_EXISTS",
			ErrorKind::AccessDenied => "MOCKFS_ACCESS_DENIED",
			ErrorKind::InUse => "MOCKFS_IN_USE",
			ErrorKind::PlatformNotSupported => "MOCKFS_NOT_SUPPORTED",
			ErrorKind::Disposed => "MOCKFS_DISPOSED",
			ErrorKind::UnsupportedStreamDirection => "MOCKFS_STREAM_DIRECTION",
			ErrorKind::OutOfRange => "MOCKFS_OUT_OF_RANGE",
			ErrorKind::Io => "MOCKFS_IO_ERROR",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"mockfsCode": self.code(),
			"message": self.to_string(),
		})
	}
}

impl From<FsError> for io::Error {
	fn from(err: FsError) -> Self {
		let kind = match err.kind() {
			ErrorKind::InvalidArgument | ErrorKind::UnsupportedPathFormat => {
				io::ErrorKind::InvalidInput
			}
			ErrorKind::FileNotFound | ErrorKind::DirectoryNotFound => io::ErrorKind::NotFound,
			ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
			ErrorKind::AccessDenied => io::ErrorKind::PermissionDenied,
			ErrorKind::PlatformNotSupported | ErrorKind::UnsupportedStreamDirection => {
				io::ErrorKind::Unsupported
			}
			ErrorKind::OutOfRange => io::ErrorKind::InvalidInput,
			ErrorKind::InUse | ErrorKind::Disposed | ErrorKind::Io => io::ErrorKind::Other,
		};
		io::Error::new(kind, err)
	}
}
