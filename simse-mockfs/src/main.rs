use clap::Parser;
use simse_mockfs_engine::config::CliArgs;
use simse_mockfs_engine::fs::MockFileSystem;
use simse_mockfs_engine::server::MockFsServer;
use simse_mockfs_engine::transport::NdjsonTransport;

fn main() {
	let args = CliArgs::parse();

	// stdout carries the protocol; logs go to stderr
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let options = args.fs_options();
	let fs = match MockFileSystem::with_options(options.clone()) {
		Ok(fs) => fs,
		Err(e) => {
			tracing::error!("Invalid filesystem options: {}", e);
			std::process::exit(2);
		}
	};

	let transport = NdjsonTransport::new();
	let mut server = MockFsServer::new(transport, fs, options);

	tracing::info!(current = %args.current_directory, format = %args.drive_format, "simse-mockfs-engine ready");

	if let Err(e) = server.run() {
		tracing::error!("Server error: {}", e);
		std::process::exit(1);
	}
}
