#![cfg(target_arch = "wasm32")]
//! Browser front-end: mounts the kaleidoscope into a container element and
//! exposes a [`Kaleidoscope`] handle to the JS shell.

mod audio;
mod constants;
mod dom;
mod events;
mod frame;
mod input;
mod media;
mod render;
mod stage2d;

use crate::audio::AudioGraph;
use crate::constants::{CANVAS_2D_CLASS, CANVAS_GPU_CLASS, CAPTURE_MIME, MOTION_PERMISSION_GRANTED};
use crate::events::Listener;
use crate::frame::{FrameContext, RafLoop};
use crate::media::Media;
use kaleido_core::{
    AcquireError, AudioSource, Epoch, Gesture, ObjectUrl, ParamsPatch, TextureSource,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys as web;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("kaleido-web loaded");
    Ok(())
}

type GestureCallback = Rc<RefCell<Option<js_sys::Function>>>;

fn emit(callback: &GestureCallback, gesture: Gesture) {
    // clone out so the shell may re-enter the handle from its callback
    let f = callback.borrow().clone();
    if let Some(f) = f {
        if let Err(e) = f.call1(&JsValue::NULL, &JsValue::from_str(gesture.as_str())) {
            log::warn!("[gesture] shell callback threw: {:?}", e);
        }
    }
}

fn to_js(e: AcquireError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Take ownership of `blob:` URLs so they are revoked when replaced.
fn owned_url(url: &str) -> Option<ObjectUrl> {
    url.starts_with("blob:").then(|| {
        ObjectUrl::new(url, |u| {
            if let Err(e) = web::Url::revoke_object_url(u) {
                log::warn!("[store] revokeObjectURL failed: {:?}", e);
            }
        })
    })
}

/// iOS gates orientation events behind `DeviceOrientationEvent.requestPermission`;
/// other browsers have no such function and grant implicitly.
async fn request_motion_permission() -> Result<(), AcquireError> {
    let window = web::window().ok_or_else(|| AcquireError::Unavailable("no window".into()))?;
    let ctor = js_sys::Reflect::get(&window, &JsValue::from_str("DeviceOrientationEvent"))
        .map_err(|_| AcquireError::Unavailable("DeviceOrientationEvent".into()))?;
    if ctor.is_undefined() {
        return Err(AcquireError::Unavailable("DeviceOrientationEvent".into()));
    }
    let request = js_sys::Reflect::get(&ctor, &JsValue::from_str("requestPermission"))
        .ok()
        .and_then(|f| f.dyn_into::<js_sys::Function>().ok());
    let Some(request) = request else {
        return Ok(());
    };
    let promise = request
        .call0(&ctor)
        .and_then(|p| p.dyn_into::<js_sys::Promise>())
        .map_err(|e| AcquireError::PermissionDenied(format!("{e:?}")))?;
    let state = JsFuture::from(promise)
        .await
        .map_err(|e| AcquireError::PermissionDenied(format!("{e:?}")))?;
    match state.as_string().as_deref() {
        Some(MOTION_PERMISSION_GRANTED) => Ok(()),
        other => Err(AcquireError::PermissionDenied(format!(
            "motion permission {}",
            other.unwrap_or("unknown")
        ))),
    }
}

/// A mounted kaleidoscope. Every method is safe to call at any time; after
/// [`Kaleidoscope::unmount`] they become no-ops or reject.
#[wasm_bindgen]
pub struct Kaleidoscope {
    ctx: Rc<RefCell<FrameContext>>,
    raf: RafLoop,
    listeners: Vec<Listener>,
    resize: Option<dom::ResizeWatch>,
    texture_epoch: Epoch,
    audio_epoch: Epoch,
    gesture_cb: GestureCallback,
    canvases: Vec<web::HtmlCanvasElement>,
    mounted: bool,
}

#[wasm_bindgen]
impl Kaleidoscope {
    /// Mount into the element with id `element_id`, sized to that element.
    pub fn mount(element_id: &str) -> Result<Kaleidoscope, JsValue> {
        let document =
            dom::window_document().ok_or_else(|| JsValue::from_str("no document"))?;
        let container = document
            .get_element_by_id(element_id)
            .ok_or_else(|| JsValue::from_str(&format!("missing #{element_id}")))?;
        if let Some(el) = container.dyn_ref::<web::HtmlElement>() {
            let style = el.style();
            if style.get_property_value("position").unwrap_or_default().is_empty() {
                style.set_property("position", "relative")?;
            }
        }

        // a canvas holds either a 2d or a webgpu context, never both
        let canvas_2d = dom::create_stage_canvas(&document, &container, CANVAS_2D_CLASS)?;
        let canvas_gpu = dom::create_stage_canvas(&document, &container, CANVAS_GPU_CLASS)?;
        let stage2d = stage2d::Stage2d::new(&document, canvas_2d.clone())?;
        let ctx = Rc::new(RefCell::new(FrameContext::new(stage2d, canvas_gpu.clone())));
        ctx.borrow_mut().resize();

        let gesture_cb: GestureCallback = Rc::new(RefCell::new(None));
        let listeners = Self::wire_inputs(&container, &ctx, &gesture_cb)?;

        let resize = {
            let ctx = ctx.clone();
            dom::ResizeWatch::observe(&container, move || {
                if let Ok(mut c) = ctx.try_borrow_mut() {
                    c.resize();
                }
            })?
        };

        let raf = {
            let ctx = ctx.clone();
            let gesture_cb = gesture_cb.clone();
            RafLoop::start(move || {
                let gesture = ctx.borrow_mut().frame();
                if let Some(g) = gesture {
                    emit(&gesture_cb, g);
                }
            })
        };
        log::info!("[mount] #{element_id}");

        Ok(Kaleidoscope {
            ctx,
            raf,
            listeners,
            resize: Some(resize),
            texture_epoch: Epoch::new(),
            audio_epoch: Epoch::new(),
            gesture_cb,
            canvases: vec![canvas_2d, canvas_gpu],
            mounted: true,
        })
    }

    /// Apply a partial parameter patch (a plain JS object, camelCase keys).
    pub fn update(&self, patch: JsValue) -> Result<(), JsValue> {
        #[allow(deprecated)]
        let patch: ParamsPatch = patch
            .into_serde()
            .map_err(|e| JsValue::from_str(&format!("invalid patch: {e}")))?;
        let mut c = self.ctx.borrow_mut();
        let changes = c.store.update(&patch);
        if changes.pipeline {
            log::info!("[params] style -> {}", c.store.params().style.as_str());
            c.driver.reset();
        }
        Ok(())
    }

    /// Current parameters as a plain JS object.
    pub fn params(&self) -> Result<JsValue, JsValue> {
        #[allow(deprecated)]
        JsValue::from_serde(self.ctx.borrow().store.params())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Roll new visuals and return the resulting parameters.
    pub fn randomize(&self) -> Result<JsValue, JsValue> {
        self.ctx
            .borrow_mut()
            .store
            .randomize(&mut rand::thread_rng());
        self.params()
    }

    pub fn on_gesture(&self, callback: Option<js_sys::Function>) {
        *self.gesture_cb.borrow_mut() = callback;
    }

    pub fn attach_image(&self, url: String) -> js_sys::Promise {
        self.attach_texture(TextureSource::Image { url })
    }

    pub fn attach_video(&self, url: String) -> js_sys::Promise {
        self.attach_texture(TextureSource::Video { url })
    }

    pub fn attach_camera(&self) -> js_sys::Promise {
        self.attach_texture(TextureSource::Camera)
    }

    pub fn detach_texture(&self) {
        self.texture_epoch.cancel();
        self.ctx.borrow_mut().release_texture();
    }

    pub fn attach_microphone(&self) -> js_sys::Promise {
        self.attach_audio(AudioSource::Microphone)
    }

    pub fn attach_audio_file(&self, url: String) -> js_sys::Promise {
        self.attach_audio(AudioSource::File { url })
    }

    pub fn detach_audio(&self) {
        self.audio_epoch.cancel();
        self.ctx.borrow_mut().release_audio();
    }

    /// Ask for motion permission where the browser requires it, then turn
    /// tilt on. A denial leaves the flag unchanged.
    pub fn enable_tilt(&self) -> js_sys::Promise {
        let ctx = self.ctx.clone();
        future_to_promise(async move {
            request_motion_permission().await.map_err(|e| {
                log::warn!("[tilt] {}", e);
                to_js(e)
            })?;
            ctx.borrow_mut().store.set_tilt(true);
            log::info!("[tilt] enabled");
            Ok(JsValue::TRUE)
        })
    }

    pub fn disable_tilt(&self) {
        self.ctx.borrow_mut().store.set_tilt(false);
    }

    /// The visible frame as a PNG data URL. The loop keeps running.
    pub fn capture_png(&self) -> Result<String, JsValue> {
        let canvas = self.ctx.borrow_mut().capture_canvas();
        canvas.to_data_url_with_type(CAPTURE_MIME)
    }

    /// Stop the loop, remove listeners and canvases and release every
    /// acquired resource. Idempotent.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.raf.cancel();
        self.texture_epoch.cancel();
        self.audio_epoch.cancel();
        // unmount may run from inside one of these handlers
        let listeners = std::mem::take(&mut self.listeners);
        wasm_bindgen_futures::spawn_local(async move {
            drop(listeners);
        });
        self.resize = None;
        *self.gesture_cb.borrow_mut() = None;
        if let Ok(mut c) = self.ctx.try_borrow_mut() {
            c.teardown();
        }
        for canvas in self.canvases.drain(..) {
            canvas.remove();
        }
        log::info!("[mount] unmounted");
    }
}

impl Kaleidoscope {
    fn wire_inputs(
        container: &web::Element,
        ctx: &Rc<RefCell<FrameContext>>,
        gesture_cb: &GestureCallback,
    ) -> Result<Vec<Listener>, JsValue> {
        let mut listeners = Vec::new();
        let window: web::EventTarget = web::window()
            .ok_or_else(|| JsValue::from_str("no window"))?
            .into();
        let target: &web::EventTarget = container.as_ref();

        {
            let ctx = ctx.clone();
            let el = container.clone();
            listeners.push(Listener::new(target, "pointermove", move |ev: web::PointerEvent| {
                ctx.borrow_mut().driver.pointer(input::pointer_uv(&ev, &el));
            })?);
        }
        {
            let ctx = ctx.clone();
            let cb = gesture_cb.clone();
            listeners.push(Listener::new(target, "pointerdown", move |_: web::PointerEvent| {
                let g = ctx.borrow_mut().gestures.down(instant::now());
                if let Some(g) = g {
                    emit(&cb, g);
                }
            })?);
        }
        for kind in ["pointerup", "pointerleave", "pointercancel"] {
            let ctx = ctx.clone();
            listeners.push(Listener::new(target, kind, move |_: web::PointerEvent| {
                ctx.borrow_mut().gestures.up();
            })?);
        }
        {
            let ctx = ctx.clone();
            let cb = gesture_cb.clone();
            listeners.push(Listener::new(&window, "keydown", move |ev: web::KeyboardEvent| {
                let g = ctx.borrow().gestures.key(&ev.key());
                if let Some(g) = g {
                    emit(&cb, g);
                }
            })?);
        }
        {
            let ctx = ctx.clone();
            listeners.push(Listener::with_capture(
                &window,
                "deviceorientation",
                true,
                move |ev: web::DeviceOrientationEvent| {
                    let (beta, gamma) = input::orientation_event_angles(&ev);
                    let mut c = ctx.borrow_mut();
                    let enabled = c.store.params().tilt_enabled;
                    c.driver.orientation(beta, gamma, enabled);
                },
            )?);
        }
        Ok(listeners)
    }

    fn attach_texture(&self, source: TextureSource) -> js_sys::Promise {
        if !self.mounted {
            return js_sys::Promise::reject(&JsValue::from_str("unmounted"));
        }
        // the old pipeline stops now; the pattern path covers the gap. A
        // re-attached URL keeps its handle so it is not revoked before loading.
        let handle = {
            let mut c = self.ctx.borrow_mut();
            let held = source.url().and_then(|u| c.store.reclaim_texture(u));
            c.release_texture();
            held.or_else(|| source.url().and_then(owned_url))
        };
        let ticket = self.texture_epoch.begin();
        let ctx = self.ctx.clone();
        future_to_promise(async move {
            let acquired = match &source {
                TextureSource::Image { url } => Media::image(url).await,
                TextureSource::Video { url } => Media::video(url).await,
                TextureSource::Camera => Media::camera().await,
                TextureSource::None => return Ok(JsValue::FALSE),
            };
            let media = acquired.map_err(|e| {
                log::warn!("[media] {} acquisition failed: {}", source_kind(&source), e);
                to_js(e)
            })?;
            if !ticket.is_current() {
                // dropping releases the stale media and handle immediately
                return Err(to_js(AcquireError::Cancelled));
            }
            let needs_gpu = ctx.borrow().mirror.is_none();
            if needs_gpu {
                let canvas = ctx.borrow().gpu_canvas.clone();
                let renderer = render::init_mirror(canvas).await;
                if !ticket.is_current() {
                    if let Some(r) = renderer {
                        r.teardown();
                    }
                    return Err(to_js(AcquireError::Cancelled));
                }
                let Some(renderer) = renderer else {
                    return Err(to_js(AcquireError::Unavailable("WebGPU".into())));
                };
                let mut c = ctx.borrow_mut();
                c.mirror = Some(renderer);
                c.resize();
            }
            log::info!("[media] {} attached", media.kind());
            ctx.borrow_mut().install_media(source, handle, media);
            Ok(JsValue::TRUE)
        })
    }

    fn attach_audio(&self, source: AudioSource) -> js_sys::Promise {
        if !self.mounted {
            return js_sys::Promise::reject(&JsValue::from_str("unmounted"));
        }
        let handle = {
            let mut c = self.ctx.borrow_mut();
            let held = source.url().and_then(|u| c.store.reclaim_audio(u));
            c.release_audio();
            held.or_else(|| source.url().and_then(owned_url))
        };
        let ticket = self.audio_epoch.begin();
        let ctx = self.ctx.clone();
        future_to_promise(async move {
            let acquired = match &source {
                AudioSource::Microphone => AudioGraph::microphone().await,
                AudioSource::File { url } => AudioGraph::file(url).await,
                AudioSource::None => return Ok(JsValue::FALSE),
            };
            let graph = acquired.map_err(|e| {
                log::warn!("[audio] acquisition failed: {}", e);
                to_js(e)
            })?;
            if !ticket.is_current() {
                return Err(to_js(AcquireError::Cancelled));
            }
            let mut c = ctx.borrow_mut();
            c.audio = Some(graph);
            c.store.set_audio(source, handle);
            Ok(JsValue::TRUE)
        })
    }
}

impl Drop for Kaleidoscope {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn source_kind(source: &TextureSource) -> &'static str {
    match source {
        TextureSource::None => "none",
        TextureSource::Image { .. } => "image",
        TextureSource::Video { .. } => "video",
        TextureSource::Camera => "camera",
    }
}
