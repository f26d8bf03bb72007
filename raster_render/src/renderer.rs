//! The `Renderer` contract (§4.F): an opaque collaborator that turns a geographic center and
//! zoom level into a premultiplied RGBA image. The real vector-to-raster engine is external
//! to this crate; [`StubRenderer`] is a deterministic stand-in used by tests and by any
//! deployment that hasn't wired in a real engine yet.

use anyhow::Result;
use raster_core::GeoCenter;

/// A premultiplied RGBA image, as produced by `render_still` before PNG encoding.
pub struct RenderedImage {
	pub width: u32,
	pub height: u32,
	/// `width * height * 4` bytes, row-major, premultiplied alpha.
	pub rgba: Vec<u8>,
}

/// The single operation the rendering engine must provide. Implementations are free to run
/// their own internal thread pool; from the caller's perspective this is a blocking call made
/// while holding the [`crate::RenderArbiter`] (§4.H).
pub trait Renderer: Send + Sync {
	fn render_still(&self, center: GeoCenter, zoom: f64, width: u32, height: u32) -> Result<RenderedImage>;
}

/// A deterministic renderer for tests and style-less deployments: paints a gradient derived
/// from `(center, zoom)` so that distinct tiles produce distinct, reproducible images without
/// depending on an actual map style or network access.
pub struct StubRenderer;

impl Renderer for StubRenderer {
	fn render_still(&self, center: GeoCenter, zoom: f64, width: u32, height: u32) -> Result<RenderedImage> {
		let mut rgba = vec![0u8; (width * height * 4) as usize];
		let r = (((center.lon + 180.0) / 360.0) * 255.0) as u8;
		let g = (((center.lat + 90.0) / 180.0) * 255.0) as u8;
		let b = ((zoom.clamp(0.0, 22.0) / 22.0) * 255.0) as u8;
		for pixel in rgba.chunks_exact_mut(4) {
			pixel[0] = r;
			pixel[1] = g;
			pixel[2] = b;
			pixel[3] = 255;
		}
		Ok(RenderedImage { width, height, rgba })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stub_renderer_produces_a_fully_opaque_image_of_the_requested_size() {
		let image = StubRenderer.render_still(GeoCenter::new(10.0, 20.0), 5.0, 4, 4).unwrap();
		assert_eq!(image.rgba.len(), 4 * 4 * 4);
		assert!(image.rgba.chunks_exact(4).all(|p| p[3] == 255));
	}

	#[test]
	fn distinct_centers_produce_distinct_images() {
		let a = StubRenderer.render_still(GeoCenter::new(-170.0, -80.0), 0.0, 2, 2).unwrap();
		let b = StubRenderer.render_still(GeoCenter::new(170.0, 80.0), 0.0, 2, 2).unwrap();
		assert_ne!(a.rgba, b.rgba);
	}
}
