//! Revocable resource handles and acquisition tickets.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

type Release = Box<dyn FnOnce(&str)>;

/// A URL whose backing resource must be released when no longer used
/// (a browser object URL, a temporary file). Released exactly once, on drop.
pub struct ObjectUrl {
    url: String,
    release: Option<Release>,
}

impl ObjectUrl {
    pub fn new(url: impl Into<String>, release: impl FnOnce(&str) + 'static) -> Self {
        Self {
            url: url.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Give up ownership of the resource without releasing it.
    pub fn disarm(mut self) -> String {
        self.release = None;
        std::mem::take(&mut self.url)
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            log::debug!("releasing {}", self.url);
            release(&self.url);
        }
    }
}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUrl")
            .field("url", &self.url)
            .field("managed", &self.release.is_some())
            .finish()
    }
}

/// Monotonic counter used to tell a pending async acquisition whether it is
/// still wanted when it completes.
///
/// Each new request calls [`Epoch::begin`]; any request (or explicit cancel)
/// after it invalidates the returned [`Ticket`].
#[derive(Clone, Debug, Default)]
pub struct Epoch(Rc<Cell<u64>>);

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        let next = self.0.get().wrapping_add(1);
        self.0.set(next);
        Ticket {
            epoch: self.0.clone(),
            issued: next,
        }
    }

    /// Invalidate every outstanding ticket.
    pub fn cancel(&self) {
        self.0.set(self.0.get().wrapping_add(1));
    }
}

#[derive(Clone, Debug)]
pub struct Ticket {
    epoch: Rc<Cell<u64>>,
    issued: u64,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.epoch.get() == self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_releases_once_on_drop() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let url = ObjectUrl::new("blob:a", move |u| {
            assert_eq!(u, "blob:a");
            c.set(c.get() + 1);
        });
        assert_eq!(count.get(), 0);
        drop(url);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn newer_request_invalidates_ticket() {
        let epoch = Epoch::new();
        let first = epoch.begin();
        assert!(first.is_current());
        let second = epoch.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        epoch.cancel();
        assert!(!second.is_current());
    }
}
