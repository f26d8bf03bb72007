//! Persistent cache store and the `FileSource` facades built on top of it (§4.C–§4.E).

pub mod file_source;
pub mod raster_cache;
pub mod store;
pub mod vector_source;

pub use file_source::{FileSource, RequestHandle};
pub use raster_cache::RasterCache;
pub use store::CacheStore;
pub use vector_source::VectorSource;
