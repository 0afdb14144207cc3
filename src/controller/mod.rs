//! Request-level entry point for page flows.
//!
//! The controller turns each incoming request into exactly one reply. It
//! starts a flow when the request names one, resumes a flow when it carries
//! a token, and renders one of the configured reply pages for everything
//! that went wrong. Nothing is returned to the transport as an error.

use crate::config::ReplyPages;
use crate::core::{ContinuationToken, Page, PageResponse, UserInput};
use crate::engine::{EngineError, FlowRunner, Outcome};
use crate::store::ContinuationStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One inbound request.
///
/// A token takes precedence over a flow name: the request resumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<ContinuationToken>,

    #[serde(default)]
    pub input: UserInput,
}

impl FlowRequest {
    pub fn start(flow: impl Into<String>) -> Self {
        Self {
            flow: Some(flow.into()),
            ..Self::default()
        }
    }

    pub fn resume(token: impl Into<ContinuationToken>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn with_input(mut self, input: UserInput) -> Self {
        self.input = input;
        self
    }
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Suspended,
    Completed,
    Terminated,
    /// Token unknown, already used or past its time-to-live
    Expired,
    /// Flow code failed; resuming with the same token may be retried
    Error,
    NotFound,
    /// Continuation store is full
    Unavailable,
    /// The token is being resumed by another request; it stays valid
    Busy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub kind: ReplyKind,
    pub page: PageResponse,
}

impl Reply {
    pub fn token(&self) -> Option<&ContinuationToken> {
        self.page.token.as_ref()
    }

    pub fn target_page(&self) -> &str {
        &self.page.target_page
    }

    /// True when the reply came from the flow itself.
    pub fn is_flow_page(&self) -> bool {
        matches!(
            self.kind,
            ReplyKind::Suspended | ReplyKind::Completed | ReplyKind::Terminated
        )
    }
}

impl From<Outcome> for Reply {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Suspended(page) => Self {
                kind: ReplyKind::Suspended,
                page,
            },
            Outcome::Completed(page) => Self {
                kind: ReplyKind::Completed,
                page,
            },
            Outcome::Terminated(page) => Self {
                kind: ReplyKind::Terminated,
                page,
            },
        }
    }
}

/// Routes requests to the flow runner and renders replies.
#[derive(Clone)]
pub struct SessionController {
    runner: FlowRunner,
    pages: ReplyPages,
}

impl SessionController {
    pub fn new(runner: FlowRunner, pages: ReplyPages) -> Self {
        Self { runner, pages }
    }

    pub fn runner(&self) -> &FlowRunner {
        &self.runner
    }

    pub fn store(&self) -> &Arc<dyn ContinuationStore> {
        self.runner.suspender().store()
    }

    pub fn pages(&self) -> &ReplyPages {
        &self.pages
    }

    pub fn handle(&self, request: FlowRequest) -> Reply {
        let FlowRequest { flow, token, input } = request;

        match (token, flow) {
            (Some(token), flow) => {
                if let Some(flow) = flow {
                    tracing::debug!(flow = %flow, token = %token, "Flow name ignored on resume");
                }
                let result = self.runner.resume(&token, input);
                self.reply(result, Some(&token))
            }
            (None, Some(flow)) => {
                let result = self.runner.start(&flow, input);
                self.reply(result, None)
            }
            (None, None) => {
                tracing::warn!("Request carries neither a flow nor a token");
                Reply {
                    kind: ReplyKind::NotFound,
                    page: Page::new(self.pages.not_found.as_str()).respond(None),
                }
            }
        }
    }

    /// Go back from the page shown under `token`.
    pub fn handle_back(&self, token: &ContinuationToken) -> Reply {
        let result = self.runner.back(token);
        self.reply(result, Some(token))
    }

    /// Drop every expired continuation now.
    pub fn sweep(&self) -> usize {
        let store = self.store();
        let removed = store.sweep(store.now());
        tracing::debug!(removed, "Swept expired continuations");
        removed
    }

    fn reply(
        &self,
        result: Result<Outcome, EngineError>,
        token: Option<&ContinuationToken>,
    ) -> Reply {
        match result {
            Ok(outcome) => outcome.into(),
            Err(error) => self.render_error(error, token),
        }
    }

    /// Render an engine error as a reply page.
    ///
    /// Unless the token is gone, the reply carries it back so the same
    /// request can be submitted again.
    fn render_error(&self, error: EngineError, token: Option<&ContinuationToken>) -> Reply {
        if error.is_expired() {
            let mut page =
                Page::new(self.pages.expired.as_str()).with("reason", error.to_string());
            if let Some(token) = token {
                page = page.with("token", token.as_str());
            }
            return Reply {
                kind: ReplyKind::Expired,
                page: page.respond(None),
            };
        }

        match error {
            EngineError::UnknownFlow(flow) => {
                tracing::warn!(flow = %flow, "Request for unknown flow");
                Reply {
                    kind: ReplyKind::NotFound,
                    page: Page::new(self.pages.not_found.as_str())
                        .with("flow", flow)
                        .respond(None),
                }
            }
            EngineError::ContinuationBusy { token: busy } => {
                tracing::debug!(token = %busy, "Token submitted while already resuming");
                Reply {
                    kind: ReplyKind::Busy,
                    page: Page::new(self.pages.busy.as_str()).respond(Some(busy)),
                }
            }
            EngineError::UserCode {
                flow,
                point,
                source,
            } => Reply {
                kind: ReplyKind::Error,
                page: Page::new(self.pages.error.as_str())
                    .with("flow", flow)
                    .with("point", point)
                    .with("message", source.to_string())
                    .respond(token.cloned()),
            },
            EngineError::ResourceExhausted { capacity } => {
                tracing::warn!(capacity, "Continuation store is full");
                Reply {
                    kind: ReplyKind::Unavailable,
                    page: Page::new(self.pages.unavailable.as_str()).respond(token.cloned()),
                }
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                Reply {
                    kind: ReplyKind::Error,
                    page: Page::new(self.pages.error.as_str())
                        .with("message", other.to_string())
                        .respond(token.cloned()),
                }
            }
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("flows", &self.runner.registry().names())
            .field("pages", &self.pages)
            .finish()
    }
}
