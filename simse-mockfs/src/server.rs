// ---------------------------------------------------------------------------
// MockFsServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to
// MockFileSystem operations: a main `run()` loop, a `dispatch()` match, a
// `with_fs` helper, and free-standing handler functions for each method.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::MockFileSystemOptions;
use crate::error::FsError;
use crate::fs::MockFileSystem;
use crate::protocol::*;
use crate::store::FileAttributes;
use crate::transport::NdjsonTransport;

// ---------------------------------------------------------------------------
// Handler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
enum HandlerError {
	#[error("Invalid params: {0}")]
	InvalidParams(String),
	#[error(transparent)]
	Fs(#[from] FsError),
}

type HandlerResult = Result<serde_json::Value, HandlerError>;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// JSON-RPC server that dispatches requests to a [`MockFileSystem`].
pub struct MockFsServer {
	transport: NdjsonTransport,
	fs: MockFileSystem,
	/// Defaults that `initialize` starts from.
	options: MockFileSystemOptions,
}

impl MockFsServer {
	pub fn new(transport: NdjsonTransport, fs: MockFileSystem, options: MockFileSystemOptions) -> Self {
		Self {
			transport,
			fs,
			options,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> io::Result<()> {
		let stdin = io::stdin();
		self.serve(stdin.lock())
	}

	/// Serve every request line from `reader` until EOF.
	pub fn serve(&mut self, reader: impl BufRead) -> io::Result<()> {
		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::warn!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		tracing::debug!(id, method = %req.method, "request");
		let result = match req.method.as_str() {
			// -- Lifecycle -----------------------------------------------
			"initialize" => self.handle_initialize(req.params),

			// -- Files ---------------------------------------------------
			"fs/writeAllBytes" => self.with_fs(|fs| handle_write_all_bytes(fs, req.params)),
			"fs/readAllBytes" => self.with_fs(|fs| handle_read_all_bytes(fs, req.params)),
			"fs/writeAllText" => self.with_fs(|fs| handle_write_all_text(fs, req.params)),
			"fs/readAllText" => self.with_fs(|fs| handle_read_all_text(fs, req.params)),
			"fs/exists" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				Ok(serde_json::json!({ "exists": fs.exists(p.path.as_deref()) }))
			}),
			"fs/delete" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				fs.delete(p.path.as_deref())?;
				Ok(serde_json::json!({}))
			}),
			"fs/move" => self.with_fs(|fs| handle_move(fs, req.params)),
			"fs/copy" => self.with_fs(|fs| handle_copy(fs, req.params)),
			"fs/replace" => self.with_fs(|fs| handle_replace(fs, req.params)),
			"fs/encrypt" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				fs.encrypt(p.path.as_deref())?;
				Ok(serde_json::json!({}))
			}),
			"fs/decrypt" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				fs.decrypt(p.path.as_deref())?;
				Ok(serde_json::json!({}))
			}),
			"fs/getAttributes" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				let attributes = fs.get_attributes(p.path.as_deref())?;
				to_value(AttributesResult::from(attributes))
			}),
			"fs/setAttributes" => self.with_fs(|fs| handle_set_attributes(fs, req.params)),
			"fs/getTimes" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				let times = fs.times(p.path.as_deref())?;
				to_value(TimesResult::from(times))
			}),
			"fs/length" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				let length = fs.file_length(p.path.as_deref())?;
				Ok(serde_json::json!({ "length": length }))
			}),

			// -- Directories ---------------------------------------------
			"dir/create" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				fs.create_directory(p.path.as_deref())?;
				Ok(serde_json::json!({}))
			}),
			"dir/delete" => self.with_fs(|fs| {
				let p: DeleteDirectoryParams = parse_params(req.params)?;
				fs.delete_directory(p.path.as_deref(), p.recursive)?;
				Ok(serde_json::json!({}))
			}),
			"dir/exists" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				Ok(serde_json::json!({ "exists": fs.directory_exists(p.path.as_deref()) }))
			}),
			"dir/move" => self.with_fs(|fs| {
				let p: TransferParams = parse_params(req.params)?;
				fs.move_directory(p.source.as_deref(), p.destination.as_deref())?;
				Ok(serde_json::json!({}))
			}),
			"dir/setCurrent" => self.with_fs(|fs| {
				let p: PathParams = parse_params(req.params)?;
				fs.set_current_directory(p.path.as_deref())?;
				Ok(serde_json::json!({ "currentDirectory": fs.current_directory() }))
			}),

			// -- Volumes -------------------------------------------------
			"drive/add" => self.with_fs(|fs| handle_add_drive(fs, req.params)),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(HandlerError::InvalidParams(message)) => {
				tracing::warn!(id, "{}", message);
				self.transport
					.write_error(id, INVALID_PARAMS, format!("Invalid params: {message}"), None)
			}
			Err(HandlerError::Fs(e)) => self.transport.write_error(
				id,
				MOCKFS_ERROR,
				e.to_string(),
				Some(e.to_json_rpc_error()),
			),
		}
	}

	// ── Filesystem accessor ───────────────────────────────────────────────

	fn with_fs<F>(&self, f: F) -> HandlerResult
	where
		F: FnOnce(&MockFileSystem) -> HandlerResult,
	{
		f(&self.fs)
	}

	// ── Initialize ────────────────────────────────────────────────────────

	/// Replace the filesystem with a fresh one. Handles from the previous
	/// instance stay valid against the old tree only.
	fn handle_initialize(&mut self, params: serde_json::Value) -> HandlerResult {
		let p: InitializeParams = if params.is_null() {
			InitializeParams::default()
		} else {
			parse_params(params)?
		};

		let mut options = self.options.clone();
		if let Some(dir) = p.current_directory {
			options = options.with_current_directory(dir);
		}
		if let Some(format) = p.drive_format {
			options = options.with_drive_format(format);
		}

		self.fs = MockFileSystem::with_options(options)?;
		tracing::info!(current = %self.fs.current_directory(), "filesystem initialized");
		Ok(serde_json::json!({
			"currentDirectory": self.fs.current_directory(),
			"drives": self.fs.drives(),
		}))
	}
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, HandlerError> {
	serde_json::from_value(params).map_err(|e| HandlerError::InvalidParams(e.to_string()))
}

fn to_value(value: impl serde::Serialize) -> HandlerResult {
	serde_json::to_value(value).map_err(|e| HandlerError::InvalidParams(e.to_string()))
}

fn handle_write_all_bytes(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: WriteBytesParams = parse_params(params)?;
	let bytes = STANDARD
		.decode(p.data.as_bytes())
		.map_err(|e| HandlerError::InvalidParams(format!("data is not base64: {e}")))?;
	fs.write_all_bytes(p.path.as_deref(), &bytes)?;
	Ok(serde_json::json!({ "length": bytes.len() }))
}

fn handle_read_all_bytes(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: PathParams = parse_params(params)?;
	let bytes = fs.read_all_bytes(p.path.as_deref())?;
	Ok(serde_json::json!({ "data": STANDARD.encode(&bytes), "length": bytes.len() }))
}

fn handle_write_all_text(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: WriteTextParams = parse_params(params)?;
	if p.append {
		fs.append_all_text(p.path.as_deref(), &p.text)?;
	} else {
		fs.write_all_text(p.path.as_deref(), &p.text)?;
	}
	Ok(serde_json::json!({}))
}

fn handle_read_all_text(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: PathParams = parse_params(params)?;
	let text = fs.read_all_text(p.path.as_deref())?;
	Ok(serde_json::json!({ "text": text }))
}

fn handle_move(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: TransferParams = parse_params(params)?;
	if p.overwrite {
		fs.move_file_overwrite(p.source.as_deref(), p.destination.as_deref())?;
	} else {
		fs.move_file(p.source.as_deref(), p.destination.as_deref())?;
	}
	Ok(serde_json::json!({}))
}

fn handle_copy(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: TransferParams = parse_params(params)?;
	fs.copy(p.source.as_deref(), p.destination.as_deref(), p.overwrite)?;
	Ok(serde_json::json!({}))
}

fn handle_replace(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: ReplaceParams = parse_params(params)?;
	fs.replace(p.source.as_deref(), p.destination.as_deref(), p.backup.as_deref())?;
	Ok(serde_json::json!({}))
}

fn handle_set_attributes(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: SetAttributesParams = parse_params(params)?;
	fs.set_attributes(p.path.as_deref(), FileAttributes::from_bits_truncate(p.attributes))?;
	let attributes = fs.get_attributes(p.path.as_deref())?;
	to_value(AttributesResult::from(attributes))
}

fn handle_add_drive(fs: &MockFileSystem, params: serde_json::Value) -> HandlerResult {
	let p: AddDriveParams = parse_params(params)?;
	match p.format {
		Some(format) => fs.add_drive(&p.name, &format)?,
		None => fs.add_share(&p.name)?,
	}
	let format = fs.drive_format(&p.name)?;
	Ok(serde_json::json!({ "drives": fs.drives(), "format": format }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	fn run(requests: &[serde_json::Value]) -> Vec<serde_json::Value> {
		let buf = Arc::new(Mutex::new(Vec::new()));
		let options = MockFileSystemOptions::default();
		let mut server = MockFsServer::new(
			NdjsonTransport::with_writer(buf.clone()),
			MockFileSystem::new(),
			options,
		);
		let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
		server.serve(input.as_bytes()).unwrap();

		let bytes = buf.lock().unwrap().clone();
		String::from_utf8(bytes)
			.unwrap()
			.lines()
			.map(|l| serde_json::from_str(l).unwrap())
			.collect()
	}

	fn req(id: u64, method: &str, params: serde_json::Value) -> serde_json::Value {
		serde_json::json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
	}

	#[test]
	fn text_round_trip_through_dispatch() {
		let out = run(&[
			req(1, "fs/writeAllText", serde_json::json!({ "path": "C:\\a.txt", "text": "hi" })),
			req(2, "fs/readAllText", serde_json::json!({ "path": "c:\\A.TXT" })),
			req(3, "fs/length", serde_json::json!({ "path": "C:\\a.txt" })),
		]);
		assert_eq!(out[1]["result"]["text"], "hi");
		assert_eq!(out[2]["result"]["length"], 2);
	}

	#[test]
	fn bytes_are_base64() {
		let out = run(&[
			req(1, "fs/writeAllBytes", serde_json::json!({ "path": "C:\\b.bin", "data": "AAEC" })),
			req(2, "fs/readAllBytes", serde_json::json!({ "path": "C:\\b.bin" })),
			req(3, "fs/writeAllBytes", serde_json::json!({ "path": "C:\\b.bin", "data": "***" })),
		]);
		assert_eq!(out[0]["result"]["length"], 3);
		assert_eq!(out[1]["result"]["data"], "AAEC");
		assert_eq!(out[2]["error"]["code"], INVALID_PARAMS);
	}

	#[test]
	fn filesystem_errors_carry_code_and_message() {
		let out = run(&[req(1, "fs/readAllText", serde_json::json!({ "path": "C:\\none.txt" }))]);
		let error = &out[0]["error"];
		assert_eq!(error["code"], MOCKFS_ERROR);
		assert_eq!(error["message"], "Could not find file 'C:\\none.txt'.");
		assert_eq!(error["data"]["mockfsCode"], "MOCKFS_FILE_NOT_FOUND");
	}

	#[test]
	fn null_path_reports_argument_null() {
		let out = run(&[req(1, "fs/delete", serde_json::json!({ "path": null }))]);
		assert_eq!(
			out[0]["error"]["message"],
			"Value cannot be null. (Parameter 'path')"
		);
	}

	#[test]
	fn unknown_method_and_garbage_lines() {
		let buf = Arc::new(Mutex::new(Vec::new()));
		let mut server = MockFsServer::new(
			NdjsonTransport::with_writer(buf.clone()),
			MockFileSystem::new(),
			MockFileSystemOptions::default(),
		);
		let input = "not json\n\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"fs/nope\"}\n";
		server.serve(input.as_bytes()).unwrap();

		let text = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
		let lines: Vec<serde_json::Value> =
			text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
		assert_eq!(lines.len(), 1);
		assert_eq!(lines[0]["id"], 9);
		assert_eq!(lines[0]["error"]["code"], METHOD_NOT_FOUND);
	}

	#[test]
	fn initialize_resets_tree() {
		let out = run(&[
			req(1, "fs/writeAllText", serde_json::json!({ "path": "C:\\a.txt", "text": "x" })),
			req(2, "initialize", serde_json::json!({ "currentDirectory": "D:\\work" })),
			req(3, "fs/exists", serde_json::json!({ "path": "C:\\a.txt" })),
			req(4, "fs/exists", serde_json::json!({ "path": "D:\\work" })),
			req(5, "dir/exists", serde_json::json!({ "path": "D:\\work" })),
		]);
		assert_eq!(out[1]["result"]["currentDirectory"], "D:\\work");
		assert_eq!(out[2]["result"]["exists"], false);
		assert_eq!(out[3]["result"]["exists"], false);
		assert_eq!(out[4]["result"]["exists"], true);
	}

	#[test]
	fn attributes_round_trip() {
		let out = run(&[
			req(1, "fs/writeAllText", serde_json::json!({ "path": "C:\\a.txt", "text": "x" })),
			req(2, "fs/setAttributes", serde_json::json!({ "path": "C:\\a.txt", "attributes": 3 })),
			req(3, "fs/delete", serde_json::json!({ "path": "C:\\a.txt" })),
		]);
		assert_eq!(out[1]["result"]["attributes"], 3);
		assert_eq!(out[1]["result"]["names"], serde_json::json!(["READ_ONLY", "HIDDEN"]));
		assert_eq!(out[2]["error"]["data"]["mockfsCode"], "MOCKFS_ACCESS_DENIED");
	}

	#[test]
	fn drive_add_reports_format() {
		let out = run(&[
			req(1, "drive/add", serde_json::json!({ "name": "F:", "format": "FAT32" })),
			req(2, "fs/writeAllText", serde_json::json!({ "path": "F:\\f.txt", "text": "x" })),
			req(3, "fs/encrypt", serde_json::json!({ "path": "F:\\f.txt" })),
		]);
		assert_eq!(out[0]["result"]["format"], "FAT32");
		assert_eq!(out[0]["result"]["drives"], serde_json::json!(["C:\\", "F:\\"]));
		assert_eq!(
			out[2]["error"]["message"],
			"File encryption is not supported on this platform."
		);
	}
}
