//! DOM listener registration with removal on drop.
//!
//! Handlers only observe: nothing here calls `preventDefault` or
//! `stopPropagation`, so the shell keeps receiving every event.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

pub struct Listener {
    target: web::EventTarget,
    kind: &'static str,
    capture: bool,
    closure: Closure<dyn FnMut(web::Event)>,
}

impl Listener {
    /// Listen for `kind` events on `target`, downcast to `E`. Events of
    /// another type are skipped.
    pub fn new<E>(
        target: &web::EventTarget,
        kind: &'static str,
        handler: impl FnMut(E) + 'static,
    ) -> Result<Self, JsValue>
    where
        E: JsCast + 'static,
    {
        Self::with_capture(target, kind, false, handler)
    }

    pub fn with_capture<E>(
        target: &web::EventTarget,
        kind: &'static str,
        capture: bool,
        mut handler: impl FnMut(E) + 'static,
    ) -> Result<Self, JsValue>
    where
        E: JsCast + 'static,
    {
        let closure = Closure::wrap(Box::new(move |ev: web::Event| {
            if let Ok(ev) = ev.dyn_into::<E>() {
                handler(ev);
            }
        }) as Box<dyn FnMut(web::Event)>);
        target.add_event_listener_with_callback_and_bool(
            kind,
            closure.as_ref().unchecked_ref(),
            capture,
        )?;
        Ok(Self {
            target: target.clone(),
            kind,
            capture,
            closure,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self.target.remove_event_listener_with_callback_and_bool(
            self.kind,
            self.closure.as_ref().unchecked_ref(),
            self.capture,
        );
        log::debug!("[events] removed {} listener", self.kind);
    }
}
