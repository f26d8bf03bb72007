mod config;
mod handlers;
mod server;
mod state;
mod stats;

use server::Server;
use state::AppState;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
	let config = match config::parse_and_validate() {
		Ok(config) => config,
		Err(err) => {
			eprintln!("config error: {err:#}");
			return ExitCode::FAILURE;
		}
	};

	env_logger::Builder::new().filter_level(config.cli_verbosity).format_timestamp(None).init();

	let state = match AppState::bootstrap(&config) {
		Ok(state) => state,
		Err(err) => {
			log::error!("failed to start: {err:#}");
			return ExitCode::FAILURE;
		}
	};

	log::info!("{} listening on {}:{}", state.name, config.bind, config.port);
	let mut server = Server::new(config.bind.clone(), config.port, state);
	if let Err(err) = server.run_until_signal().await {
		log::error!("server error: {err:#}");
		return ExitCode::FAILURE;
	}

	log::info!("shut down cleanly");
	ExitCode::SUCCESS
}
