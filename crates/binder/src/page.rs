//! In-process page model: triggers that can be activated and text surfaces
//! that handlers write into.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use shared::domain::{ActivationSeq, SurfaceMode};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::PageError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A text region handlers write into. Handlers never read it back.
pub trait DisplaySurface: Send + Sync {
    fn replace_text(&self, text: &str);
    fn append_entry(&self, text: &str);

    fn write(&self, mode: SurfaceMode, text: &str) {
        match mode {
            SurfaceMode::Replace => self.replace_text(text),
            SurfaceMode::Append => self.append_entry(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    /// Child entries in order; a replacement leaves exactly one.
    pub entries: Vec<String>,
    /// Number of writes applied so far.
    pub revision: u64,
}

impl SurfaceSnapshot {
    pub fn text(&self) -> String {
        self.entries.join("\n")
    }
}

/// In-memory [`DisplaySurface`].
#[derive(Debug)]
pub struct TextSurface {
    id: String,
    state: Mutex<SurfaceSnapshot>,
}

impl TextSurface {
    pub fn new(id: impl Into<String>, initial_text: impl Into<String>) -> Self {
        let initial_text = initial_text.into();
        let entries = if initial_text.is_empty() {
            Vec::new()
        } else {
            vec![initial_text]
        };
        Self {
            id: id.into(),
            state: Mutex::new(SurfaceSnapshot {
                entries,
                revision: 0,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> String {
        lock(&self.state).text()
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.state).entries.clone()
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        lock(&self.state).clone()
    }
}

impl DisplaySurface for TextSurface {
    fn replace_text(&self, text: &str) {
        {
            let mut state = lock(&self.state);
            state.entries = vec![text.to_string()];
            state.revision += 1;
        }
        debug!(surface = %self.id, text, "surface text replaced");
    }

    fn append_entry(&self, text: &str) {
        {
            let mut state = lock(&self.state);
            state.entries.push(text.to_string());
            state.revision += 1;
        }
        debug!(surface = %self.id, text, "surface entry appended");
    }
}

#[derive(Debug, Clone)]
pub struct Activation {
    pub trigger_id: Arc<str>,
    pub seq: ActivationSeq,
}

struct TriggerInner {
    id: Arc<str>,
    activations: AtomicU64,
    listeners: Mutex<Vec<mpsc::UnboundedSender<Activation>>>,
}

/// A UI element whose activation starts the handlers bound to it.
///
/// Cloning yields another handle to the same trigger.
#[derive(Clone)]
pub struct Trigger {
    inner: Arc<TriggerInner>,
}

impl Trigger {
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self {
            inner: Arc::new(TriggerInner {
                id: Arc::from(id),
                activations: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Delivers one activation to every bound handler and returns how many
    /// received it. Activations with nothing bound are dropped.
    pub fn activate(&self) -> usize {
        let seq = ActivationSeq(self.inner.activations.fetch_add(1, Ordering::Relaxed) + 1);
        let mut listeners = lock(&self.inner.listeners);
        listeners.retain(|tx| {
            tx.send(Activation {
                trigger_id: Arc::clone(&self.inner.id),
                seq,
            })
            .is_ok()
        });
        debug!(trigger = %self.inner.id, %seq, listeners = listeners.len(), "trigger activated");
        listeners.len()
    }

    pub fn activation_count(&self) -> u64 {
        self.inner.activations.load(Ordering::Relaxed)
    }

    pub(crate) fn listen(&self) -> mpsc::UnboundedReceiver<Activation> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner.listeners).push(tx);
        rx
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.inner.id)
            .field("activations", &self.activation_count())
            .finish()
    }
}

/// Registry of the triggers and surfaces on a page, addressable by id or,
/// for triggers, by document position.
#[derive(Default)]
pub struct Page {
    triggers: Vec<Trigger>,
    surfaces: Vec<Arc<TextSurface>>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_unused(&self, id: &str) -> Result<(), PageError> {
        let taken = self.triggers.iter().any(|t| t.id() == id)
            || self.surfaces.iter().any(|s| s.id() == id);
        if taken {
            return Err(PageError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    pub fn add_trigger(&mut self, id: &str) -> Result<Trigger, PageError> {
        self.ensure_unused(id)?;
        let trigger = Trigger::new(id);
        self.triggers.push(trigger.clone());
        Ok(trigger)
    }

    pub fn add_surface(
        &mut self,
        id: &str,
        initial_text: impl Into<String>,
    ) -> Result<Arc<TextSurface>, PageError> {
        self.ensure_unused(id)?;
        let surface = Arc::new(TextSurface::new(id, initial_text));
        self.surfaces.push(Arc::clone(&surface));
        Ok(surface)
    }

    pub fn trigger(&self, id: &str) -> Result<Trigger, PageError> {
        self.triggers
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or_else(|| PageError::UnknownTrigger(id.to_string()))
    }

    pub fn trigger_at(&self, index: usize) -> Result<Trigger, PageError> {
        self.triggers
            .get(index)
            .cloned()
            .ok_or(PageError::NoTriggerAt(index))
    }

    pub fn surface(&self, id: &str) -> Result<Arc<TextSurface>, PageError> {
        self.surfaces
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| PageError::UnknownSurface(id.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
