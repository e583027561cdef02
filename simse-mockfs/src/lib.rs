//! An in-memory filesystem that reproduces Windows path, sharing and
//! timestamp semantics, plus a JSON-RPC server exposing it over stdio.

pub mod clock;
pub mod config;
pub mod error;
pub mod fs;
pub mod hooks;
pub mod locks;
pub mod path;
pub mod protocol;
pub mod server;
pub mod store;
pub mod stream;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MockFileSystemOptions;
pub use error::{ErrorKind, FsError, FsResult};
pub use fs::MockFileSystem;
pub use hooks::{CopyGate, CopySync, NoCopySync};
pub use path::{normalize, PathContext, ResolvedPath, Root};
pub use store::{FileAttributes, FileTimes};
pub use stream::{FileAccess, FileMode, FileOptions, FileStream, OpenOptions, MAX_STREAM_LENGTH};
