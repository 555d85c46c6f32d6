//! Optional per-coder event observer.
//!
//! Coders always emit events to `tracing` at trace level; an injected
//! observer additionally receives every event as a callback.

use std::fmt;

/// Something a coder did that an observer may care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodingEvent {
    /// The encoder emitted a systematic payload for `index`.
    SystematicSent { index: usize },
    /// The encoder emitted a coded payload.
    CodedSent,
    /// The encoder applied feedback acknowledging `acknowledged` symbols.
    FeedbackRead { acknowledged: usize },
    /// The decoder accepted a row; the rank changed.
    RankChanged { pivot: usize, rank: usize },
    /// The decoder discarded a linearly dependent payload.
    Redundant { rank: usize },
    /// The decoder reached full rank.
    Complete { rank: usize },
    /// A recoded payload was emitted from `rank` rows.
    Recoded { rank: usize },
}

pub type ObserverFn = Box<dyn FnMut(&CodingEvent) + Send>;

/// Holder for an optional observer.
#[derive(Default)]
pub struct Observer {
    callback: Option<ObserverFn>,
}

impl Observer {
    pub fn set(&mut self, callback: Option<ObserverFn>) {
        self.callback = callback;
    }

    pub fn is_set(&self) -> bool {
        self.callback.is_some()
    }

    pub fn emit(&mut self, event: CodingEvent) {
        tracing::trace!(?event, "coding event");
        if let Some(cb) = self.callback.as_mut() {
            cb(&event);
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("set", &self.is_set())
            .finish()
    }
}
