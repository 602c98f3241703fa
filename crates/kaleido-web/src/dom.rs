use crate::input;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// Match the canvas backing store to its CSS box times the device pixel
/// ratio. Returns true when the size changed.
pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) -> bool {
    let Some(w) = web::window() else {
        return false;
    };
    let rect = canvas.get_bounding_client_rect();
    let (w_px, h_px) = input::backing_size(rect.width(), rect.height(), w.device_pixel_ratio());
    if canvas.width() == w_px && canvas.height() == h_px {
        return false;
    }
    canvas.set_width(w_px);
    canvas.set_height(h_px);
    true
}

/// A canvas stretched over its container, appended to `parent`.
pub fn create_stage_canvas(
    document: &web::Document,
    parent: &web::Element,
    class: &str,
) -> Result<web::HtmlCanvasElement, JsValue> {
    let canvas: web::HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_class_name(class);
    let style = canvas.style();
    style.set_property("position", "absolute")?;
    style.set_property("inset", "0")?;
    style.set_property("width", "100%")?;
    style.set_property("height", "100%")?;
    style.set_property("display", "block")?;
    parent.append_child(&canvas)?;
    Ok(canvas)
}

/// Detached canvas with a fixed backing size.
pub fn create_offscreen_canvas(
    document: &web::Document,
    width: u32,
    height: u32,
) -> Result<web::HtmlCanvasElement, JsValue> {
    let canvas: web::HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_width(width);
    canvas.set_height(height);
    Ok(canvas)
}

pub fn set_visible(el: &web::HtmlElement, visible: bool) {
    let _ = el
        .style()
        .set_property("display", if visible { "block" } else { "none" });
}

/// ResizeObserver on the container; disconnected on drop.
pub struct ResizeWatch {
    observer: web::ResizeObserver,
    _closure: Closure<dyn FnMut(js_sys::Array)>,
}

impl ResizeWatch {
    pub fn observe(target: &web::Element, mut on_resize: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let closure = Closure::wrap(Box::new(move |_entries: js_sys::Array| on_resize())
            as Box<dyn FnMut(js_sys::Array)>);
        let observer = web::ResizeObserver::new(closure.as_ref().unchecked_ref())?;
        observer.observe(target);
        Ok(Self {
            observer,
            _closure: closure,
        })
    }

    pub fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for ResizeWatch {
    fn drop(&mut self) {
        self.disconnect();
    }
}
