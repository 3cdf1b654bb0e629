use clap::Parser;
use tether_cli::{
	cli::Cli,
	commands, logging,
	output::{self, CommandResult},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let command = cli.command.name();
	match commands::dispatch(cli).await {
		Ok(data) => output::print_result(&CommandResult::success(command, data)),
		Err(err) => {
			eprintln!("error: {err:#}");
			output::print_result(&CommandResult::failure(command, &err));
			std::process::exit(1);
		}
	}
}
