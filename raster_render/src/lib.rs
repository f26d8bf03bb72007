//! Rendering: the `Renderer` contract, the process-wide render arbiter, per-worker dedicated
//! threads, and cache-first-then-render tile loading (§4.F–§4.I).

pub mod arbiter;
pub mod renderer;
pub mod tile_loader;
pub mod worker;

pub use arbiter::RenderArbiter;
pub use renderer::{RenderedImage, Renderer, StubRenderer};
pub use tile_loader::{Tile, TileLoader};
pub use worker::{RendererWorker, WorkerError};
