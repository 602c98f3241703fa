use crate::constants::{MAX_DEVICE_PIXEL_RATIO, MIN_BACKING_PX};
use web_sys as web;

/// Backing-store size for a canvas laid out at `css_width` x `css_height`.
#[inline]
pub fn backing_size(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> (u32, u32) {
    let dpr = if device_pixel_ratio.is_finite() {
        device_pixel_ratio.clamp(1.0, MAX_DEVICE_PIXEL_RATIO)
    } else {
        1.0
    };
    let px = |css: f64| {
        let v = if css.is_finite() { (css.max(0.0) * dpr).floor() } else { 0.0 };
        (v as u32).max(MIN_BACKING_PX)
    };
    (px(css_width), px(css_height))
}

/// Client coordinates to [0,1]² relative to an element box. A collapsed
/// box reports the center.
#[inline]
pub fn client_uv(client: [f32; 2], origin: [f32; 2], size: [f32; 2]) -> [f32; 2] {
    if size[0] > 0.0 && size[1] > 0.0 {
        [
            ((client[0] - origin[0]) / size[0]).clamp(0.0, 1.0),
            ((client[1] - origin[1]) / size[1]).clamp(0.0, 1.0),
        ]
    } else {
        [0.5, 0.5]
    }
}

#[inline]
pub fn pointer_uv(ev: &web::PointerEvent, el: &web::Element) -> [f32; 2] {
    let rect = el.get_bounding_client_rect();
    client_uv(
        [ev.client_x() as f32, ev.client_y() as f32],
        [rect.left() as f32, rect.top() as f32],
        [rect.width() as f32, rect.height() as f32],
    )
}

/// `(beta, gamma)` in degrees; missing axes read as level.
#[inline]
pub fn orientation_angles(beta: Option<f64>, gamma: Option<f64>) -> (f32, f32) {
    let deg = |v: Option<f64>| v.filter(|v| v.is_finite()).unwrap_or(0.0) as f32;
    (deg(beta), deg(gamma))
}

#[inline]
pub fn orientation_event_angles(ev: &web::DeviceOrientationEvent) -> (f32, f32) {
    orientation_angles(ev.beta(), ev.gamma())
}
