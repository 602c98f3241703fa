// GPU side of the web front-end.

pub mod helpers;
mod mirror;

pub use mirror::MirrorRenderer;

/// Initialize the mirror renderer on `canvas`, logging instead of failing.
pub async fn init_mirror(canvas: web_sys::HtmlCanvasElement) -> Option<MirrorRenderer> {
    match MirrorRenderer::new(canvas).await {
        Ok(r) => Some(r),
        Err(e) => {
            log::warn!("[gpu] WebGPU unavailable, staying on the 2D path: {:?}", e);
            None
        }
    }
}
