use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	// 0 = only warnings (probe failures, exhausted retries)
	// 1 (-v) = session and keep-alive lifecycle, each retry
	// 2+ (-vv) = every request
	let filter = match verbosity {
		0 => "warn",
		1 => "info,tether.retry=debug",
		_ => "debug,reqwest=info,hyper=info",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.compact()
		.init();
}
