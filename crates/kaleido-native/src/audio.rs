// ---------------- Native microphone analysis (cpal + FFT) ----------------

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SizedSample};
use kaleido_core::constants::{
    ANALYSER_FFT_SIZE, ANALYSER_MAX_DB, ANALYSER_MIN_DB, ANALYSER_SMOOTHING,
};
use kaleido_core::{AcquireError, Spectrum};
use spectrum_analyzer::scaling::divide_by_N;
use spectrum_analyzer::windows::hann_window;
use spectrum_analyzer::{samples_fft_to_spectrum, FrequencyLimit};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Ring = Arc<Mutex<VecDeque<f32>>>;

/// Map a linear magnitude onto the analyser's byte scale: `min_db` and
/// below read 0, `max_db` and above read 255.
pub fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude.is_nan() || magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let t = (db - ANALYSER_MIN_DB) / (ANALYSER_MAX_DB - ANALYSER_MIN_DB);
    (t.clamp(0.0, 1.0) * 255.0) as u8
}

/// Default input device feeding a mono ring buffer on the audio thread.
/// The render thread turns the latest window into byte spectrum bins the
/// same way a WebAudio `AnalyserNode` does.
pub struct MicInput {
    _stream: cpal::Stream,
    ring: Ring,
    sample_rate: u32,
    window: Vec<f32>,
    smoothed: Vec<f32>,
}

impl MicInput {
    pub fn open() -> Result<Self, AcquireError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AcquireError::Unavailable("no input device".into()))?;
        let config = device
            .default_input_config()
            .map_err(|e| AcquireError::Unavailable(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let ring: Ring = Arc::new(Mutex::new(VecDeque::with_capacity(
            ANALYSER_FFT_SIZE as usize,
        )));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_input::<f32>(&device, &config.into(), channels, ring.clone())
            }
            cpal::SampleFormat::I16 => {
                build_input::<i16>(&device, &config.into(), channels, ring.clone())
            }
            cpal::SampleFormat::U16 => {
                build_input::<u16>(&device, &config.into(), channels, ring.clone())
            }
            other => {
                return Err(AcquireError::Unavailable(format!(
                    "sample format {other:?}"
                )))
            }
        }
        .map_err(|e| AcquireError::Unavailable(e.to_string()))?;
        stream
            .play()
            .map_err(|e| AcquireError::Unavailable(e.to_string()))?;
        log::info!(
            "[audio] microphone attached ({} Hz, {} ch)",
            sample_rate,
            channels
        );

        let bins = (ANALYSER_FFT_SIZE / 2) as usize;
        Ok(Self {
            _stream: stream,
            ring,
            sample_rate,
            window: Vec::with_capacity(ANALYSER_FFT_SIZE as usize),
            smoothed: vec![0.0; bins],
        })
    }

    /// Copy the newest samples into the analysis window, zero-padded at the
    /// front until the ring has filled once.
    fn fill_window(&mut self) {
        let n = ANALYSER_FFT_SIZE as usize;
        self.window.clear();
        self.window.resize(n, 0.0);
        if let Ok(ring) = self.ring.lock() {
            let skip = n - ring.len().min(n);
            for (dst, &s) in self.window[skip..].iter_mut().zip(ring.iter()) {
                *dst = s;
            }
        }
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    ring: Ring,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: cpal::FromSample<T>,
{
    let capacity = ANALYSER_FFT_SIZE as usize;
    let channels = channels.max(1);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let Ok(mut ring) = ring.lock() else {
                return;
            };
            for frame in data.chunks(channels) {
                let mono =
                    frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() / frame.len() as f32;
                if ring.len() == capacity {
                    ring.pop_front();
                }
                ring.push_back(mono);
            }
        },
        |err| log::error!("[audio] input stream error: {err}"),
        None,
    )
}

impl Spectrum for MicInput {
    fn byte_frequency_data(&mut self, out: &mut Vec<u8>) -> usize {
        self.fill_window();
        let windowed = hann_window(&self.window);
        let spectrum = match samples_fft_to_spectrum(
            &windowed,
            self.sample_rate,
            FrequencyLimit::All,
            Some(&divide_by_N),
        ) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("[audio] fft failed: {:?}", e);
                out.clear();
                return 0;
            }
        };
        let bins = self.smoothed.len();
        out.resize(bins, 0);
        let tau = ANALYSER_SMOOTHING as f32;
        for ((slot, byte), (_, value)) in self
            .smoothed
            .iter_mut()
            .zip(out.iter_mut())
            .zip(spectrum.data().iter())
        {
            *slot = tau * *slot + (1.0 - tau) * value.val();
            *byte = magnitude_to_byte(*slot);
        }
        bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_and_garbage_read_zero() {
        assert_eq!(magnitude_to_byte(0.0), 0);
        assert_eq!(magnitude_to_byte(-1.0), 0);
        assert_eq!(magnitude_to_byte(f32::NAN), 0);
    }

    #[test]
    fn byte_scale_spans_the_db_window() {
        // -100 dB, -20 dB and 0 dB as linear magnitudes
        assert_eq!(magnitude_to_byte(1e-5), 0);
        assert_eq!(magnitude_to_byte(0.1), 255);
        assert_eq!(magnitude_to_byte(1.0), 255);
        let mid = magnitude_to_byte(10f32.powf(-65.0 / 20.0));
        assert!((126..=128).contains(&mid), "mid = {mid}");
    }
}
