// Resource-handle ownership of the parameter store.

use kaleido_core::*;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn tracked(url: &str, log: &Log) -> ObjectUrl {
    let log = log.clone();
    ObjectUrl::new(url, move |u| log.borrow_mut().push(u.to_string()))
}

fn image(url: &str) -> TextureSource {
    TextureSource::Image { url: url.into() }
}

#[test]
fn clearing_texture_releases_handle_once() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    store.set_texture(image("blob:1"), Some(tracked("blob:1", &log)));
    assert!(log.borrow().is_empty());

    let changes = store.clear_texture();
    assert!(changes.pipeline);
    assert_eq!(*log.borrow(), ["blob:1"]);
    assert_eq!(store.params().texture, TextureSource::None);

    store.clear_texture();
    drop(store);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn repeated_cycles_do_not_leak() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    for i in 0..25 {
        let url = format!("blob:{i}");
        store.set_texture(image(&url), Some(tracked(&url, &log)));
        store.clear_texture();
    }
    assert_eq!(log.borrow().len(), 25);
    assert!(!store.has_texture_handle());
}

#[test]
fn switching_variant_releases_previous_before_storing_new() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    store.set_texture(image("blob:a"), Some(tracked("blob:a", &log)));
    store.set_texture(
        TextureSource::Video { url: "blob:b".into() },
        Some(tracked("blob:b", &log)),
    );
    assert_eq!(*log.borrow(), ["blob:a"]);
    store.set_texture(TextureSource::Camera, None);
    assert_eq!(*log.borrow(), ["blob:a", "blob:b"]);
}

#[test]
fn dropping_store_releases_held_handles() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    store.set_texture(image("blob:t"), Some(tracked("blob:t", &log)));
    store.set_audio(
        AudioSource::File { url: "blob:s".into() },
        Some(tracked("blob:s", &log)),
    );
    drop(store);
    let mut released = log.borrow().clone();
    released.sort();
    assert_eq!(released, ["blob:s", "blob:t"]);
}

#[test]
fn audio_same_url_keeps_handle() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    let file = AudioSource::File { url: "blob:song".into() };
    store.set_audio(file.clone(), Some(tracked("blob:song", &log)));
    store.set_audio(file, Some(tracked("blob:song", &log)));
    assert!(log.borrow().is_empty());
    assert!(store.has_audio_handle());

    store.set_audio(AudioSource::Microphone, None);
    assert_eq!(*log.borrow(), ["blob:song"]);
    assert!(!store.has_audio_handle());
}

#[test]
fn stop_audio_releases_file() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    store.set_audio(
        AudioSource::File { url: "blob:x".into() },
        Some(tracked("blob:x", &log)),
    );
    let changes = store.stop_audio();
    assert!(changes.audio);
    assert_eq!(*log.borrow(), ["blob:x"]);
    assert_eq!(store.params().audio, AudioSource::None);
}

#[test]
fn revision_tracks_effective_changes() {
    let mut store = ParamStore::new();
    let r0 = store.revision();
    store.update(&ParamsPatch::default());
    assert_eq!(store.revision(), r0);
    store.update(&ParamsPatch {
        segments: Some(7),
        ..ParamsPatch::default()
    });
    assert_eq!(store.revision(), r0 + 1);
    store.set_tilt(true);
    assert!(store.params().tilt_enabled);
    assert_eq!(store.revision(), r0 + 2);
}

#[test]
fn snapshot_is_detached_from_later_updates() {
    let mut store = ParamStore::new();
    let before = store.snapshot();
    store.update(&ParamsPatch {
        glow: Some(0.9),
        ..ParamsPatch::default()
    });
    assert_eq!(before.glow, 0.4);
    assert_eq!(store.params().glow, 0.9);
}

#[test]
fn reattaching_same_audio_url_is_not_revoked_before_reload() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    let song = AudioSource::File { url: "blob:song".into() };
    store.set_audio(song.clone(), Some(tracked("blob:song", &log)));

    // what the front-end does before re-acquiring the same file
    let held = store.reclaim_audio("blob:song");
    store.stop_audio();
    assert!(held.is_some());
    assert!(log.borrow().is_empty());

    store.set_audio(song, held);
    assert!(log.borrow().is_empty());
    assert!(store.has_audio_handle());

    store.stop_audio();
    assert_eq!(*log.borrow(), ["blob:song"]);
}

#[test]
fn reclaim_ignores_other_urls() {
    let log: Log = Default::default();
    let mut store = ParamStore::new();
    store.set_texture(image("blob:a"), Some(tracked("blob:a", &log)));
    assert!(store.reclaim_texture("blob:b").is_none());
    assert!(store.has_texture_handle());

    let held = store.reclaim_texture("blob:a");
    store.clear_texture();
    assert!(log.borrow().is_empty());
    store.set_texture(image("blob:a"), held);
    drop(store);
    assert_eq!(*log.borrow(), ["blob:a"]);
}
