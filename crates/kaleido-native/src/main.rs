use std::path::Path;
use std::time::Instant;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use kaleido_core::{
    AcquireError, AudioSource, FrameDriver, Gesture, GestureTracker, MirrorView, ParamStore,
    ParamsPatch, RenderPath, SoftwareRenderer, Spectrum, StyleMode, TextureSource,
};

mod audio;
mod gpu;

use audio::MicInput;
use gpu::{GpuState, Pass};

// The software pattern path renders at most this many pixels on the long
// side; the present pass scales it to the window.
const RENDER_MAX_PX: u32 = 720;
const CAPTURE_PATH: &str = "kaleidoscope.png";

/// Software frame size for a window, aspect preserved.
fn render_size(width: u32, height: u32) -> (u32, u32) {
    let long = width.max(height).max(1);
    if long <= RENDER_MAX_PX {
        return (width.max(1), height.max(1));
    }
    let scale = RENDER_MAX_PX as f32 / long as f32;
    (
        ((width as f32 * scale).round() as u32).max(1),
        ((height as f32 * scale).round() as u32).max(1),
    )
}

struct App {
    store: ParamStore,
    driver: FrameDriver,
    gestures: GestureTracker,
    renderer: SoftwareRenderer,
    mic: Option<MicInput>,
    path: RenderPath,
    last_view: MirrorView,
    last_time: f64,
    started: Instant,
    scratch: Vec<u8>,
}

impl App {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            store: ParamStore::new(),
            driver: FrameDriver::new(),
            gestures: GestureTracker::new(),
            renderer: SoftwareRenderer::new(1, 1)?,
            mic: None,
            path: RenderPath::Pattern,
            last_view: MirrorView::default(),
            last_time: 0.0,
            started: Instant::now(),
            scratch: Vec::new(),
        })
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn patch(&mut self, patch: ParamsPatch) {
        let changes = self.store.update(&patch);
        if changes.pipeline {
            log::info!("[params] style -> {}", self.store.params().style.as_str());
            self.driver.reset();
        }
    }

    fn randomize(&mut self) {
        self.store.randomize(&mut rand::thread_rng());
        let p = self.store.params();
        log::info!(
            "[params] randomized: {} segments, speed {}, glow {}",
            p.segments,
            p.speed,
            p.glow
        );
    }

    fn attach_image(&mut self, gpu: &mut GpuState, path: &Path) {
        match image::open(path) {
            Ok(img) => {
                gpu.set_source(&img.to_rgba8());
                let url = path.display().to_string();
                log::info!("[media] image attached: {}", url);
                if self.store.set_texture(TextureSource::Image { url }, None).pipeline {
                    self.driver.reset();
                }
            }
            Err(e) => log::warn!(
                "[media] image acquisition failed: {}",
                AcquireError::Decode(format!("{}: {e}", path.display()))
            ),
        }
    }

    fn detach_texture(&mut self, gpu: &mut GpuState) {
        gpu.clear_source();
        if self.store.clear_texture().pipeline {
            self.driver.reset();
        }
    }

    fn toggle_microphone(&mut self) {
        if self.mic.take().is_some() {
            self.store.stop_audio();
            log::info!("[audio] microphone released");
            return;
        }
        match MicInput::open() {
            Ok(mic) => {
                self.mic = Some(mic);
                self.store.set_audio(AudioSource::Microphone, None);
            }
            Err(e) => log::warn!("[audio] acquisition failed: {}", e),
        }
    }

    fn gesture(&mut self, gesture: Gesture) {
        log::info!("[gesture] {}", gesture.as_str());
        if gesture == Gesture::DoubleTap {
            self.randomize();
        }
    }

    fn key(&mut self, key: &Key, gpu: &mut GpuState) {
        match key {
            Key::Named(NamedKey::ArrowUp) => {
                let n = self.store.params().segments + 1;
                self.patch(ParamsPatch {
                    segments: Some(n),
                    ..ParamsPatch::default()
                });
            }
            Key::Named(NamedKey::ArrowDown) => {
                let n = self.store.params().segments.saturating_sub(1);
                self.patch(ParamsPatch {
                    segments: Some(n),
                    ..ParamsPatch::default()
                });
            }
            Key::Character(c) => {
                let c = c.as_str();
                if let Some(g) = self.gestures.key(c) {
                    self.gesture(g);
                    return;
                }
                match c.to_ascii_lowercase().as_str() {
                    "r" => self.randomize(),
                    "m" => self.toggle_microphone(),
                    "t" => self.detach_texture(gpu),
                    "s" => self.capture(gpu),
                    digit => {
                        let style = digit
                            .parse::<usize>()
                            .ok()
                            .and_then(|n| n.checked_sub(1))
                            .and_then(|i| StyleMode::ALL.get(i).copied());
                        if let Some(style) = style {
                            self.patch(ParamsPatch {
                                style: Some(style),
                                ..ParamsPatch::default()
                            });
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Save the visible frame without pausing the loop.
    fn capture(&self, gpu: &GpuState) {
        let result = match self.path {
            RenderPath::Pattern => {
                let px = self.renderer.frame();
                image::RgbaImage::from_raw(px.width(), px.height(), px.to_rgba8())
                    .ok_or_else(|| anyhow::anyhow!("frame size mismatch"))
            }
            RenderPath::TextureMirror => {
                gpu.capture(Pass::Mirror(&self.last_view, self.last_time as f32))
            }
        };
        match result.and_then(|img| img.save(CAPTURE_PATH).map_err(anyhow::Error::from)) {
            Ok(()) => log::info!("[capture] wrote {}", CAPTURE_PATH),
            Err(e) => log::warn!("[capture] failed: {e:#}"),
        }
    }

    fn frame(&mut self, gpu: &mut GpuState) -> Result<(), wgpu::SurfaceError> {
        if let Some(g) = self.gestures.poll(self.now_ms()) {
            self.gesture(g);
        }
        let spectrum = self.mic.as_mut().map(|m| m as &mut dyn Spectrum);
        let plan = self
            .driver
            .tick(self.store.params(), spectrum, gpu.has_source());
        self.last_view = plan.mirror;
        self.last_time = plan.time;
        if plan.path != self.path {
            log::info!("[frame] render path {:?} -> {:?}", self.path, plan.path);
            self.path = plan.path;
        }
        match plan.path {
            RenderPath::Pattern => {
                let (w, h) = gpu.size();
                let (rw, rh) = render_size(w, h);
                if let Err(e) = self.renderer.resize(rw, rh) {
                    log::warn!("[frame] {e}");
                    return Ok(());
                }
                let frame = self.renderer.render(&plan.pattern_frame(self.store.params()));
                gpu.upload_frame(frame, &mut self.scratch);
                gpu.render(Pass::Present)
            }
            RenderPath::TextureMirror => gpu.render(Pass::Mirror(&plan.mirror, plan.time as f32)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("Kaleidoscope (native)")
        .build(&event_loop)?;
    let mut gpu = pollster::block_on(GpuState::new(&window))?;
    let mut app = App::new()?;
    if let Some(path) = std::env::args_os().nth(1) {
        app.attach_image(&mut gpu, Path::new(&path));
    }
    log::info!("keys: R randomize, 1-6 style, Up/Down segments, M mic, T detach, S save");

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::Resized(size) => gpu.resize(size),
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::CursorMoved { position, .. } => {
                let (w, h) = gpu.size();
                app.driver.pointer([
                    (position.x as f32 / w as f32).clamp(0.0, 1.0),
                    (position.y as f32 / h as f32).clamp(0.0, 1.0),
                ]);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    if let Some(g) = app.gestures.down(app.now_ms()) {
                        app.gesture(g);
                    }
                }
                ElementState::Released => app.gestures.up(),
            },
            WindowEvent::CursorLeft { .. } => app.gestures.up(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => app.key(&logical_key, &mut gpu),
            _ => {}
        },
        Event::AboutToWait => match app.frame(&mut gpu) {
            Ok(()) => gpu.window.request_redraw(),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.window.inner_size())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
            Err(e) => log::error!("render error: {:?}", e),
        },
        Event::LoopExiting => {
            app.mic = None;
            log::info!("[native] exiting");
        }
        _ => {}
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_windows_render_at_full_size() {
        assert_eq!(render_size(640, 480), (640, 480));
        assert_eq!(render_size(0, 0), (1, 1));
    }

    #[test]
    fn large_windows_are_capped_on_the_long_side() {
        assert_eq!(render_size(1440, 900), (720, 450));
        assert_eq!(render_size(1000, 2000), (360, 720));
    }
}
