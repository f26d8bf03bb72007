//! CLI flags and the validated [`Config`] built from them (§6, §10).

use anyhow::{Context, Result, bail};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Renders slippy-map raster tiles from a vector style, with caching.")]
pub struct Cli {
	/// Style URL; non-URL values are prefixed with `file://`.
	#[arg(short = 's', long)]
	pub style: String,

	/// Tile edge length in pixels: 256 or 512.
	#[arg(short = 'z', long, default_value_t = 512)]
	pub tile_size: u32,

	/// Listen port.
	#[arg(short = 'p', long, default_value_t = 11000)]
	pub port: u16,

	/// Bind address.
	#[arg(short = 'b', long, default_value = "0.0.0.0")]
	pub bind: String,

	/// Server worker threads. `0` or negative means "use all CPUs".
	#[arg(short = 't', long, default_value_t = 1)]
	pub server_threads: i64,

	/// Renderer's internal worker pool size (opaque to the core; plumbed through to the
	/// renderer implementation).
	#[arg(short = 'T', long, default_value_t = 4)]
	pub render_threads: u32,

	/// Raster cache DB file.
	#[arg(short = 'r', long, default_value = "raster.cache")]
	pub raster_cache: PathBuf,

	/// Raster cache size bound, in MiB.
	#[arg(short = 'R', long, default_value_t = 1024)]
	pub raster_cache_limit: u64,

	/// Vector cache DB file.
	#[arg(short = 'v', long, default_value = "vector.cache")]
	pub vector_cache: PathBuf,

	/// Vector cache size bound, in MiB.
	#[arg(short = 'V', long, default_value_t = 1024)]
	pub vector_cache_limit: u64,

	/// Base directory for `asset://` URLs.
	#[arg(short = 'a', long, default_value = ".")]
	pub asset_root: PathBuf,

	/// Identifier reported in `/stats`.
	#[arg(short = 'n', long, default_value = "Raster Render Server")]
	pub name: String,

	#[command(flatten)]
	pub verbose: Verbosity<InfoLevel>,
}

/// A [`Cli`] that has passed validation and had its defaults resolved (e.g. CPU count).
pub struct Config {
	pub style_url: String,
	pub tile_size: u32,
	pub port: u16,
	pub bind: String,
	pub server_threads: usize,
	pub render_threads: u32,
	pub raster_cache: PathBuf,
	pub raster_cache_limit_bytes: u64,
	pub vector_cache: PathBuf,
	pub vector_cache_limit_bytes: u64,
	pub asset_root: PathBuf,
	pub name: String,
	pub cli_verbosity: log::LevelFilter,
}

const MIB: u64 = 1024 * 1024;

impl Config {
	pub fn from_cli(cli: Cli) -> Result<Config> {
		if cli.tile_size != 256 && cli.tile_size != 512 {
			bail!("--tile-size must be 256 or 512, got {}", cli.tile_size);
		}

		let style_url =
			if cli.style.contains("://") { cli.style.clone() } else { format!("file://{}", cli.style) };

		let server_threads =
			if cli.server_threads <= 0 { num_cpus::get() } else { cli.server_threads as usize };
		let cli_verbosity = cli.verbose.log_level_filter();

		Ok(Config {
			style_url,
			tile_size: cli.tile_size,
			port: cli.port,
			bind: cli.bind,
			server_threads,
			render_threads: cli.render_threads,
			raster_cache: cli.raster_cache,
			raster_cache_limit_bytes: cli.raster_cache_limit * MIB,
			vector_cache: cli.vector_cache,
			vector_cache_limit_bytes: cli.vector_cache_limit * MIB,
			asset_root: cli.asset_root,
			name: cli.name,
			cli_verbosity,
		})
	}
}

pub fn parse_and_validate() -> Result<Config> {
	let cli = Cli::parse();
	Config::from_cli(cli).context("invalid configuration")
}
