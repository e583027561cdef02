use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use crate::store::{FileAttributes, FileTimes};

// ── JSON-RPC 2.0 error codes ────────────────────────────────────────────────

pub const INTERNAL_ERROR: i32 = -32603;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const MOCKFS_ERROR: i32 = -32000;

// ── Incoming request ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: serde_json::Value,
}

// ── Params ──────────────────────────────────────────────────────────────────
//
// Path fields are optional so that a missing or `null` path reaches the
// filesystem and fails with its own argument error.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
	pub current_directory: Option<String>,
	pub drive_format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathParams {
	pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteBytesParams {
	pub path: Option<String>,
	/// Standard base64.
	pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteTextParams {
	pub path: Option<String>,
	pub text: String,
	#[serde(default)]
	pub append: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
	pub source: Option<String>,
	pub destination: Option<String>,
	#[serde(default)]
	pub overwrite: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceParams {
	pub source: Option<String>,
	pub destination: Option<String>,
	pub backup: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAttributesParams {
	pub path: Option<String>,
	/// Raw attribute bits; unknown bits are dropped.
	pub attributes: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDirectoryParams {
	pub path: Option<String>,
	#[serde(default)]
	pub recursive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDriveParams {
	pub name: String,
	pub format: Option<String>,
}

// ── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesResult {
	pub attributes: u32,
	pub names: Vec<String>,
}

impl From<FileAttributes> for AttributesResult {
	fn from(attributes: FileAttributes) -> Self {
		Self {
			attributes: attributes.bits(),
			names: attributes
				.iter_names()
				.map(|(name, _)| name.to_string())
				.collect(),
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesResult {
	pub creation_time: DateTime<Utc>,
	pub last_write_time: DateTime<Utc>,
	pub last_access_time: DateTime<Utc>,
}

impl From<FileTimes> for TimesResult {
	fn from(times: FileTimes) -> Self {
		Self {
			creation_time: times.created,
			last_write_time: times.last_write,
			last_access_time: times.last_access,
		}
	}
}
