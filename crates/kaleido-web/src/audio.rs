use crate::constants::CROSS_ORIGIN;
use crate::media::{acquire_error, stop_tracks, user_media};
use kaleido_core::constants::{ANALYSER_FFT_SIZE, ANALYSER_SMOOTHING};
use kaleido_core::{AcquireError, Spectrum};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

/// WebAudio analysis graph feeding the energy meter.
///
/// Microphone input goes to the analyser only; a file also plays through
/// the speakers. Dropping the graph stops tracks and closes the context.
pub struct AudioGraph {
    ctx: web::AudioContext,
    analyser: web::AnalyserNode,
    stream: Option<web::MediaStream>,
    element: Option<web::HtmlAudioElement>,
    closed: bool,
}

fn unavailable(what: &str, e: JsValue) -> AcquireError {
    AcquireError::Unavailable(format!("{what}: {e:?}"))
}

fn analysis_context() -> Result<(web::AudioContext, web::AnalyserNode), AcquireError> {
    let ctx = web::AudioContext::new().map_err(|e| unavailable("AudioContext", e))?;
    let analyser = match ctx.create_analyser() {
        Ok(a) => a,
        Err(e) => {
            let _ = ctx.close();
            return Err(unavailable("AnalyserNode", e));
        }
    };
    analyser.set_fft_size(ANALYSER_FFT_SIZE);
    analyser.set_smoothing_time_constant(ANALYSER_SMOOTHING);
    Ok((ctx, analyser))
}

impl AudioGraph {
    pub async fn microphone() -> Result<Self, AcquireError> {
        let stream = user_media(&JsValue::FALSE, &JsValue::TRUE).await?;
        let (ctx, analyser) = match analysis_context() {
            Ok(pair) => pair,
            Err(e) => {
                stop_tracks(&stream);
                return Err(e);
            }
        };
        let graph = Self {
            ctx,
            analyser,
            stream: Some(stream.clone()),
            element: None,
            closed: false,
        };
        let source = graph
            .ctx
            .create_media_stream_source(&stream)
            .map_err(|e| unavailable("MediaStreamSource", e))?;
        source
            .connect_with_audio_node(&graph.analyser)
            .map_err(|e| unavailable("connect", e))?;
        graph.resume().await;
        log::info!(
            "[audio] microphone attached ({} bins)",
            graph.analyser.frequency_bin_count()
        );
        Ok(graph)
    }

    pub async fn file(url: &str) -> Result<Self, AcquireError> {
        let element = web::HtmlAudioElement::new_with_src(url)
            .map_err(|e| unavailable("audio element", e))?;
        element.set_cross_origin(Some(CROSS_ORIGIN));
        let (ctx, analyser) = analysis_context()?;
        let graph = Self {
            ctx,
            analyser,
            stream: None,
            element: Some(element.clone()),
            closed: false,
        };
        let source = graph
            .ctx
            .create_media_element_source(&element)
            .map_err(|e| unavailable("MediaElementSource", e))?;
        source
            .connect_with_audio_node(&graph.analyser)
            .map_err(|e| unavailable("connect", e))?;
        graph
            .analyser
            .connect_with_audio_node(&graph.ctx.destination())
            .map_err(|e| unavailable("connect", e))?;
        match element.play() {
            // autoplay may be blocked until the next user gesture
            Ok(promise) => {
                if let Err(e) = JsFuture::from(promise).await {
                    log::warn!("[audio] playback deferred: {:?}", acquire_error(&e));
                }
            }
            Err(e) => log::warn!("[audio] play() failed: {:?}", e),
        }
        graph.resume().await;
        log::info!("[audio] file attached: {}", url);
        Ok(graph)
    }

    async fn resume(&self) {
        if let Ok(promise) = self.ctx.resume() {
            let _ = JsFuture::from(promise).await;
        }
    }

    /// Idempotent; errors from closing an already closed context are ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(stream) = self.stream.take() {
            stop_tracks(&stream);
        }
        if let Some(element) = self.element.take() {
            let _ = element.pause();
            element.set_src("");
        }
        let _ = self.analyser.disconnect();
        let _ = self.ctx.close();
        log::info!("[audio] graph closed");
    }
}

impl Spectrum for AudioGraph {
    fn byte_frequency_data(&mut self, out: &mut Vec<u8>) -> usize {
        if self.closed {
            out.clear();
            return 0;
        }
        let bins = self.analyser.frequency_bin_count() as usize;
        if out.len() != bins {
            out.resize(bins, 0);
        }
        self.analyser.get_byte_frequency_data(out);
        bins
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.close();
    }
}
