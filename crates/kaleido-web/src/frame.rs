use crate::audio::AudioGraph;
use crate::dom;
use crate::media::Media;
use crate::render::MirrorRenderer;
use crate::stage2d::Stage2d;
use kaleido_core::{
    FrameDriver, Gesture, GestureTracker, MirrorView, ObjectUrl, ParamStore, RenderPath, Spectrum,
    TextureSource,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

/// Everything the animation callback touches, shared behind `Rc<RefCell<_>>`.
pub struct FrameContext {
    pub store: ParamStore,
    pub driver: FrameDriver,
    pub gestures: GestureTracker,
    pub stage2d: Stage2d,
    pub gpu_canvas: web::HtmlCanvasElement,
    pub mirror: Option<MirrorRenderer>,
    pub media: Option<Media>,
    pub audio: Option<AudioGraph>,
    pub path: RenderPath,
    last_time: f64,
    last_view: MirrorView,
}

impl FrameContext {
    pub fn new(stage2d: Stage2d, gpu_canvas: web::HtmlCanvasElement) -> Self {
        dom::set_visible(&gpu_canvas, false);
        Self {
            store: ParamStore::new(),
            driver: FrameDriver::new(),
            gestures: GestureTracker::new(),
            stage2d,
            gpu_canvas,
            mirror: None,
            media: None,
            audio: None,
            path: RenderPath::Pattern,
            last_time: 0.0,
            last_view: MirrorView::default(),
        }
    }

    /// Render one frame. Returns the long-press gesture if it fired, for the
    /// caller to forward once the context is no longer borrowed.
    pub fn frame(&mut self) -> Option<Gesture> {
        let gesture = self.gestures.poll(instant::now());

        let media_ready =
            self.mirror.is_some() && self.media.as_ref().is_some_and(|m| m.ready());
        let spectrum = self.audio.as_mut().map(|a| a as &mut dyn Spectrum);
        let params = self.store.params();
        let plan = self.driver.tick(params, spectrum, media_ready);
        self.last_time = plan.time;
        self.last_view = plan.mirror;

        if plan.path != self.path {
            self.switch_path(plan.path);
        }
        match plan.path {
            RenderPath::Pattern => {
                let frame = plan.pattern_frame(self.store.params());
                self.stage2d.render(&frame);
            }
            RenderPath::TextureMirror => self.draw_mirror(),
        }
        gesture
    }

    fn switch_path(&mut self, path: RenderPath) {
        log::info!("[frame] render path {:?} -> {:?}", self.path, path);
        self.path = path;
        let mirror = path == RenderPath::TextureMirror;
        dom::set_visible(&self.gpu_canvas, mirror);
        dom::set_visible(self.stage2d.canvas(), !mirror);
        self.resize();
    }

    fn draw_mirror(&mut self) {
        let (Some(mirror), Some(media)) = (self.mirror.as_mut(), self.media.as_ref()) else {
            return;
        };
        mirror.upload(media);
        match mirror.render(&self.last_view, self.last_time as f32) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => mirror.reconfigure(),
            Err(e) => log::error!("render error: {:?}", e),
        }
    }

    /// Redraw the visible surface so its contents can be read back within
    /// the current task.
    pub fn capture_canvas(&mut self) -> web::HtmlCanvasElement {
        match self.path {
            RenderPath::Pattern => self.stage2d.canvas().clone(),
            RenderPath::TextureMirror => {
                self.draw_mirror();
                self.gpu_canvas.clone()
            }
        }
    }

    pub fn resize(&mut self) {
        dom::sync_canvas_backing_size(self.stage2d.canvas());
        dom::sync_canvas_backing_size(&self.gpu_canvas);
        if let Some(m) = self.mirror.as_mut() {
            m.resize_if_needed(self.gpu_canvas.width(), self.gpu_canvas.height());
        }
    }

    /// Install freshly acquired media as the texture source.
    pub fn install_media(
        &mut self,
        source: TextureSource,
        handle: Option<ObjectUrl>,
        media: Media,
    ) {
        if let Some(m) = self.mirror.as_mut() {
            m.forget_source();
        }
        self.media = Some(media);
        let changes = self.store.set_texture(source, handle);
        if changes.pipeline {
            self.driver.reset();
        }
    }

    /// Stop and release the texture media and its handle.
    pub fn release_texture(&mut self) {
        self.media = None;
        if let Some(m) = self.mirror.take() {
            m.teardown();
        }
        if self.store.clear_texture().pipeline {
            self.driver.reset();
        }
    }

    pub fn release_audio(&mut self) {
        if let Some(mut graph) = self.audio.take() {
            graph.close();
        }
        self.store.stop_audio();
    }

    /// Release every acquired resource. Idempotent.
    pub fn teardown(&mut self) {
        self.release_texture();
        self.release_audio();
        self.driver.reset();
    }
}

type TickSlot = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// A `requestAnimationFrame` loop that reschedules itself until cancelled.
pub struct RafLoop {
    tick: TickSlot,
    pending: Rc<Cell<Option<i32>>>,
    running: Rc<Cell<bool>>,
}

fn request_frame(tick: &TickSlot, pending: &Cell<Option<i32>>) {
    let Some(w) = web::window() else {
        return;
    };
    if let Some(cb) = tick.borrow().as_ref() {
        match w.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => pending.set(Some(id)),
            Err(e) => log::error!("[frame] requestAnimationFrame failed: {:?}", e),
        }
    }
}

impl RafLoop {
    pub fn start(mut body: impl FnMut() + 'static) -> Self {
        let tick: TickSlot = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(None));
        let running = Rc::new(Cell::new(true));
        let tick_clone = tick.clone();
        let pending_tick = pending.clone();
        let running_tick = running.clone();
        *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            pending_tick.set(None);
            if !running_tick.get() {
                return;
            }
            body();
            // the body may have cancelled the loop
            if running_tick.get() {
                request_frame(&tick_clone, &pending_tick);
            }
        }) as Box<dyn FnMut()>));
        request_frame(&tick, &pending);
        Self {
            tick,
            pending,
            running,
        }
    }

    /// Idempotent. Safe to call from inside the frame body: the closure is
    /// released on a later microtask, never while it is executing.
    pub fn cancel(&self) {
        if !self.running.replace(false) {
            return;
        }
        if let (Some(id), Some(w)) = (self.pending.take(), web::window()) {
            let _ = w.cancel_animation_frame(id);
        }
        let closure = self.tick.borrow_mut().take();
        wasm_bindgen_futures::spawn_local(async move {
            drop(closure);
        });
        log::info!("[frame] loop cancelled");
    }
}

impl Drop for RafLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}
