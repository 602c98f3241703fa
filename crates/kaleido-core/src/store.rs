use crate::params::{AudioSource, Changes, KaleidoParams, ParamsPatch, TextureSource};
use crate::resource::ObjectUrl;
use rand::Rng;

/// Owner of the live [`KaleidoParams`] and of the resource handles behind
/// url-backed texture and audio sources.
///
/// Renderers never hold a reference across frames; they read a snapshot.
#[derive(Debug, Default)]
pub struct ParamStore {
    params: KaleidoParams,
    texture_handle: Option<ObjectUrl>,
    audio_handle: Option<ObjectUrl>,
    revision: u64,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: KaleidoParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &KaleidoParams {
        &self.params
    }

    pub fn snapshot(&self) -> KaleidoParams {
        self.params.clone()
    }

    /// Bumped on every effective change; lets pollers skip unchanged frames.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self, changes: Changes) -> Changes {
        if changes.any() {
            self.revision += 1;
        }
        changes
    }

    pub fn update(&mut self, patch: &ParamsPatch) -> Changes {
        let changes = self.params.apply(patch);
        self.bump(changes)
    }

    /// Switch the texture source. The previous handle is released before the
    /// new one is stored.
    pub fn set_texture(&mut self, source: TextureSource, handle: Option<ObjectUrl>) -> Changes {
        drop(self.texture_handle.take());
        let changed = source != self.params.texture;
        self.params.texture = source;
        self.texture_handle = handle;
        log::info!("texture source: {:?}", self.params.texture);
        self.bump(Changes {
            pipeline: changed,
            ..Changes::default()
        })
    }

    pub fn clear_texture(&mut self) -> Changes {
        self.set_texture(TextureSource::None, None)
    }

    /// Hand back the held texture handle, unreleased, if it owns `url`. Used
    /// when the same URL is attached again so it is not revoked before the
    /// reload.
    pub fn reclaim_texture(&mut self, url: &str) -> Option<ObjectUrl> {
        reclaim(&mut self.texture_handle, url)
    }

    /// Switch the audio source. A previous file handle is released unless the
    /// new source points at the same URL, in which case it is kept.
    pub fn set_audio(&mut self, source: AudioSource, handle: Option<ObjectUrl>) -> Changes {
        let same_url = match (&self.audio_handle, source.url()) {
            (Some(old), Some(url)) => old.url() == url,
            _ => false,
        };
        if same_url {
            if let Some(dup) = handle {
                dup.disarm();
            }
        } else {
            drop(self.audio_handle.take());
            self.audio_handle = handle;
        }
        let changed = source != self.params.audio;
        self.params.audio = source;
        log::info!("audio source: {:?}", self.params.audio);
        self.bump(Changes {
            audio: changed,
            ..Changes::default()
        })
    }

    pub fn stop_audio(&mut self) -> Changes {
        self.set_audio(AudioSource::None, None)
    }

    /// Audio counterpart of [`ParamStore::reclaim_texture`].
    pub fn reclaim_audio(&mut self, url: &str) -> Option<ObjectUrl> {
        reclaim(&mut self.audio_handle, url)
    }

    pub fn set_tilt(&mut self, enabled: bool) -> Changes {
        self.update(&ParamsPatch {
            tilt_enabled: Some(enabled),
            ..ParamsPatch::default()
        })
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Changes {
        self.params.randomize(rng);
        self.bump(Changes {
            visuals: true,
            ..Changes::default()
        })
    }

    pub fn has_texture_handle(&self) -> bool {
        self.texture_handle.is_some()
    }

    pub fn has_audio_handle(&self) -> bool {
        self.audio_handle.is_some()
    }
}

fn reclaim(slot: &mut Option<ObjectUrl>, url: &str) -> Option<ObjectUrl> {
    if slot.as_ref().is_some_and(|h| h.url() == url) {
        slot.take()
    } else {
        None
    }
}
