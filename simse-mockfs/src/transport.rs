use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

#[derive(Serialize)]
struct JsonRpcResponse<'a> {
	jsonrpc: &'a str,
	id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	result: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<JsonRpcErrorBody>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
	code: i32,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<serde_json::Value>,
}

type Sink = Arc<Mutex<dyn Write + Send>>;

/// Writes one JSON-RPC message per line. Stdout by default; any writer can
/// be plugged in to capture the output.
pub struct NdjsonTransport {
	out: Sink,
}

impl Default for NdjsonTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl NdjsonTransport {
	pub fn new() -> Self {
		Self::with_writer(Arc::new(Mutex::new(io::stdout())))
	}

	pub fn with_writer(out: Sink) -> Self {
		Self { out }
	}

	pub fn write_response(&self, id: u64, result: serde_json::Value) {
		self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: Some(result),
			error: None,
		});
	}

	pub fn write_error(
		&self,
		id: u64,
		code: i32,
		message: impl Into<String>,
		data: Option<serde_json::Value>,
	) {
		self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: None,
			error: Some(JsonRpcErrorBody {
				code,
				message: message.into(),
				data,
			}),
		});
	}

	fn write_line(&self, value: &impl Serialize) {
		let line = match serde_json::to_string(value) {
			Ok(line) => line,
			Err(e) => {
				tracing::error!("Failed to serialize: {}", e);
				return;
			}
		};
		let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
		if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
			tracing::error!("Failed to write response: {}", e);
		}
	}
}
