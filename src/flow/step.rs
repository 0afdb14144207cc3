//! The result of one dispatch of a flow state machine.

use crate::core::{Page, State};
use std::time::Duration;

/// A request to show a page and wait for the user's answer.
///
/// `state` holds exactly the locals the flow needs when it is resumed.
#[derive(Clone, Debug)]
pub struct Suspension<S: State> {
    pub state: S,
    pub page: Page,
    /// Overrides `State::bookmarkable` when set
    pub bookmark: Option<bool>,
    /// Overrides the store's default time-to-live when set
    pub ttl: Option<Duration>,
}

impl<S: State> Suspension<S> {
    pub fn new(state: S, page: Page) -> Self {
        Self {
            state,
            page,
            bookmark: None,
            ttl: None,
        }
    }

    /// The page in between two others: resumable once, never revisited.
    pub fn transient(mut self) -> Self {
        self.bookmark = Some(false);
        self
    }

    pub fn bookmark(mut self, bookmark: bool) -> Self {
        self.bookmark = Some(bookmark);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Effective bookmark flag (pure)
    pub fn is_bookmark(&self) -> bool {
        self.bookmark.unwrap_or_else(|| self.state.bookmarkable())
    }
}

/// What a flow does after running up to its next suspend point.
#[derive(Clone, Debug)]
pub enum Step<S: State> {
    /// Show a page and wait; resume later in `state`
    Suspend(Suspension<S>),

    /// The flow returned; show its final page
    Finish(Page),
}

impl<S: State> Step<S> {
    /// Suspend with default bookmark and time-to-live.
    pub fn suspend(state: S, page: Page) -> Self {
        Self::Suspend(Suspension::new(state, page))
    }

    pub fn finish(page: Page) -> Self {
        Self::Finish(page)
    }

    pub fn is_suspend(&self) -> bool {
        matches!(self, Self::Suspend(_))
    }
}

impl<S: State> From<Suspension<S>> for Step<S> {
    fn from(suspension: Suspension<S>) -> Self {
        Self::Suspend(suspension)
    }
}
