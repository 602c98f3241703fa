//! Texture media: decoded images, looping videos and the user camera.

use crate::constants::{
    CAMERA_FACING_MODE, CROSS_ORIGIN, HAVE_CURRENT_DATA, PERMISSION_ERRORS,
};
use crate::dom;
use kaleido_core::AcquireError;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

/// Classify a rejected media request by its `DOMException` name.
pub fn classify_error(name: &str, message: &str) -> AcquireError {
    if PERMISSION_ERRORS.contains(&name) {
        AcquireError::PermissionDenied(message.to_string())
    } else if name == "EncodingError" {
        AcquireError::Decode(message.to_string())
    } else {
        AcquireError::Unavailable(format!("{name}: {message}"))
    }
}

pub fn acquire_error(err: &JsValue) -> AcquireError {
    let field = |key: &str| {
        js_sys::Reflect::get(err, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default()
    };
    let name = field("name");
    let message = field("message");
    if name.is_empty() && message.is_empty() {
        return AcquireError::Unavailable(format!("{err:?}"));
    }
    classify_error(&name, &message)
}

#[inline]
pub fn video_frame_ready(ready_state: u16, width: u32) -> bool {
    ready_state >= HAVE_CURRENT_DATA && width > 0
}

#[inline]
pub fn image_frame_ready(complete: bool, natural_width: u32) -> bool {
    complete && natural_width > 0
}

/// Ask for a media stream. Audio and video constraints are passed as JS
/// values (`true`, or a constraint object).
pub async fn user_media(video: &JsValue, audio: &JsValue) -> Result<web::MediaStream, AcquireError> {
    let window = web::window().ok_or_else(|| AcquireError::Unavailable("no window".into()))?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|e| AcquireError::Unavailable(format!("mediaDevices: {e:?}")))?;
    let constraints = web::MediaStreamConstraints::new();
    constraints.set_video(video);
    constraints.set_audio(audio);
    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|e| acquire_error(&e))?;
    let stream = JsFuture::from(promise).await.map_err(|e| acquire_error(&e))?;
    stream
        .dyn_into::<web::MediaStream>()
        .map_err(|_| AcquireError::Unavailable("getUserMedia returned no stream".into()))
}

pub fn stop_tracks(stream: &web::MediaStream) {
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<web::MediaStreamTrack>() {
            track.stop();
        }
    }
}

fn looping_video() -> Result<web::HtmlVideoElement, AcquireError> {
    let document =
        dom::window_document().ok_or_else(|| AcquireError::Unavailable("no document".into()))?;
    let video: web::HtmlVideoElement = document
        .create_element("video")
        .and_then(|el| el.dyn_into().map_err(JsValue::from))
        .map_err(|e| AcquireError::Unavailable(format!("video element: {e:?}")))?;
    video.set_muted(true);
    video.set_loop(true);
    let _ = video.set_attribute("playsinline", "");
    video.set_cross_origin(Some(CROSS_ORIGIN));
    Ok(video)
}

/// Start playback; autoplay refusals are not fatal, readiness is polled.
async fn start_playback(video: &web::HtmlVideoElement) {
    match video.play() {
        Ok(promise) => {
            if let Err(e) = JsFuture::from(promise).await {
                log::warn!("[media] play() rejected: {:?}", e);
            }
        }
        Err(e) => log::warn!("[media] play() failed: {:?}", e),
    }
}

/// A live texture source. Dropping it stops playback and camera tracks.
pub enum Media {
    Image(web::HtmlImageElement),
    Video(web::HtmlVideoElement),
    Camera {
        video: web::HtmlVideoElement,
        stream: web::MediaStream,
    },
}

impl Media {
    pub async fn image(url: &str) -> Result<Self, AcquireError> {
        let img = web::HtmlImageElement::new()
            .map_err(|e| AcquireError::Unavailable(format!("image element: {e:?}")))?;
        img.set_cross_origin(Some(CROSS_ORIGIN));
        img.set_src(url);
        JsFuture::from(img.decode())
            .await
            .map_err(|e| AcquireError::Decode(format!("{url}: {e:?}")))?;
        Ok(Media::Image(img))
    }

    pub async fn video(url: &str) -> Result<Self, AcquireError> {
        let video = looping_video()?;
        video.set_src(url);
        start_playback(&video).await;
        if let Some(err) = video.error() {
            return Err(AcquireError::Decode(format!("{url}: media error {}", err.code())));
        }
        Ok(Media::Video(video))
    }

    pub async fn camera() -> Result<Self, AcquireError> {
        let video = looping_video()?;
        let constraints = js_sys::Object::new();
        let _ = js_sys::Reflect::set(
            &constraints,
            &JsValue::from_str("facingMode"),
            &JsValue::from_str(CAMERA_FACING_MODE),
        );
        let stream = user_media(&constraints.into(), &JsValue::FALSE).await?;
        video.set_src_object(Some(&stream));
        start_playback(&video).await;
        Ok(Media::Camera { video, stream })
    }

    /// Whether a frame can be uploaded right now.
    pub fn ready(&self) -> bool {
        match self {
            Media::Image(img) => image_frame_ready(img.complete(), img.natural_width()),
            Media::Video(video) | Media::Camera { video, .. } => {
                video_frame_ready(video.ready_state(), video.video_width())
            }
        }
    }

    /// Images upload once; video frames change every tick.
    pub fn is_static(&self) -> bool {
        matches!(self, Media::Image(_))
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Media::Image(img) => (img.natural_width(), img.natural_height()),
            Media::Video(video) | Media::Camera { video, .. } => {
                (video.video_width(), video.video_height())
            }
        }
    }

    pub fn external_source(&self) -> wgpu::ExternalImageSource {
        match self {
            Media::Image(img) => wgpu::ExternalImageSource::HTMLImageElement(img.clone()),
            Media::Video(video) | Media::Camera { video, .. } => {
                wgpu::ExternalImageSource::HTMLVideoElement(video.clone())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Media::Image(_) => "image",
            Media::Video(_) => "video",
            Media::Camera { .. } => "camera",
        }
    }

    fn stop(&mut self) {
        match self {
            Media::Image(img) => img.set_src(""),
            Media::Video(video) => {
                let _ = video.pause();
                video.remove_attribute("src").ok();
                video.load();
            }
            Media::Camera { video, stream } => {
                stop_tracks(stream);
                let _ = video.pause();
                video.set_src_object(None);
            }
        }
    }
}

impl Drop for Media {
    fn drop(&mut self) {
        self.stop();
        log::info!("[media] released {}", self.kind());
    }
}
