//! Runs flows between suspend points.

use super::error::EngineError;
use super::suspender::Suspender;
use crate::core::{
    ContinuationToken, FlowHistory, PageResponse, SessionId, SuspendRecord, UserInput,
};
use crate::flow::{ErasedFlow, FlowContext, FlowError, FlowRegistry, FrozenStep};
use crate::store::{Attributes, Continuation, ContinuationDraft};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Result of running a flow up to its next stopping point.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The flow is waiting; the response carries the token to resume it
    Suspended(PageResponse),

    /// The flow returned normally
    Completed(PageResponse),

    /// A helper ended the flow session from inside
    Terminated(PageResponse),
}

impl Outcome {
    pub fn response(&self) -> &PageResponse {
        match self {
            Self::Suspended(page) | Self::Completed(page) | Self::Terminated(page) => page,
        }
    }

    pub fn into_response(self) -> PageResponse {
        match self {
            Self::Suspended(page) | Self::Completed(page) | Self::Terminated(page) => page,
        }
    }

    /// Token to resume with, if the flow suspended.
    pub fn token(&self) -> Option<&ContinuationToken> {
        self.response().token.as_ref()
    }

    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Suspended(_))
    }
}

/// Where a dispatch started from, needed to store what comes next.
struct Origin {
    flow: String,
    session_id: SessionId,
    parent: Option<ContinuationToken>,
    root: Option<ContinuationToken>,
}

/// Executes registered flows, one dispatch per request.
#[derive(Clone)]
pub struct FlowRunner {
    registry: Arc<FlowRegistry>,
    suspender: Suspender,
}

impl FlowRunner {
    pub fn new(registry: FlowRegistry, suspender: Suspender) -> Self {
        Self {
            registry: Arc::new(registry),
            suspender,
        }
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn suspender(&self) -> &Suspender {
        &self.suspender
    }

    /// Run a flow from the top.
    pub fn start(&self, flow_name: &str, params: UserInput) -> Result<Outcome, EngineError> {
        let flow = self
            .registry
            .get(flow_name)
            .ok_or_else(|| EngineError::UnknownFlow(flow_name.to_string()))?;

        let session_id = SessionId::generate();
        tracing::info!(flow = %flow_name, session_id = %session_id, "Flow started");

        let mut ctx = FlowContext::new(
            flow_name,
            session_id,
            None,
            Arc::new(params),
            Attributes::new(),
        );
        let result = guarded(|| flow.start(&mut ctx));

        let origin = Origin {
            flow: flow_name.to_string(),
            session_id,
            parent: None,
            root: None,
        };
        self.settle(origin, "start", ctx, result)
    }

    /// Re-enter the flow suspended under `token`, with `input` as the
    /// value its suspend point returns.
    ///
    /// A token resumes at most once. If the flow fails the token stays
    /// usable so the user can correct the input and submit again.
    pub fn resume(
        &self,
        token: &ContinuationToken,
        input: UserInput,
    ) -> Result<Outcome, EngineError> {
        let continuation = self.suspender.enter(token)?;

        let Some(flow) = self.registry.get(&continuation.flow) else {
            self.suspender.abort(token);
            return Err(EngineError::UnknownFlow(continuation.flow.clone()));
        };

        tracing::info!(
            flow = %continuation.flow,
            session_id = %continuation.session_id,
            token = %token,
            point = %continuation.point,
            "Flow resumed"
        );

        let input = Arc::new(input);
        let mut ctx = FlowContext::new(
            continuation.flow.as_str(),
            continuation.session_id,
            Some(token.clone()),
            Arc::clone(&input),
            continuation.attributes.clone(),
        );
        let result = guarded(|| flow.resume(&continuation.state, &input, &mut ctx));

        let origin = Origin {
            flow: continuation.flow.clone(),
            session_id: continuation.session_id,
            parent: Some(token.clone()),
            root: Some(continuation.root_id.clone()),
        };

        match self.settle(origin, &continuation.point, ctx, result) {
            Ok(outcome) => {
                if !outcome.is_done() {
                    self.suspender.commit(token);
                }
                Ok(outcome)
            }
            Err(error) => {
                self.suspender.abort(token);
                Err(error)
            }
        }
    }

    /// Show a page that was already resumed once more, under a new token.
    ///
    /// Only bookmark continuations can be revisited; the original token
    /// stays spent.
    pub fn revisit(&self, token: &ContinuationToken) -> Result<Outcome, EngineError> {
        let continuation = self.suspender.store().lookup(token)?;
        if !continuation.bookmark {
            return Err(EngineError::NotBookmarkable {
                token: token.clone(),
            });
        }
        self.reissue(&continuation)
    }

    /// Go back from the page shown under `token` to the closest earlier
    /// page that may be revisited.
    pub fn back(&self, token: &ContinuationToken) -> Result<Outcome, EngineError> {
        let store = self.suspender.store();
        let current = store.lookup(token)?;

        let mut cursor = current.parent_id.clone();
        while let Some(parent) = cursor {
            let node = store.lookup(&parent)?;
            if node.bookmark {
                return self.reissue(&node);
            }
            cursor = node.parent_id.clone();
        }

        Err(EngineError::NoEarlierPage {
            token: token.clone(),
        })
    }

    /// Suspend points passed through before the page shown under `token`,
    /// oldest first.
    ///
    /// Rebuilt from parent links; stops at the first ancestor the store no
    /// longer holds.
    pub fn history(&self, token: &ContinuationToken) -> Result<FlowHistory, EngineError> {
        let store = self.suspender.store();
        let current = store.lookup(token)?;

        let mut trail = Vec::new();
        let mut cursor = current.parent_id.clone();
        while let Some(parent) = cursor {
            let Ok(node) = store.lookup(&parent) else {
                break;
            };
            trail.push(SuspendRecord {
                point: node.point.clone(),
                token: node.id.clone(),
                at: node.created_at,
            });
            cursor = node.parent_id.clone();
        }

        Ok(trail.into_iter().rev().collect())
    }

    fn reissue(&self, continuation: &Continuation) -> Result<Outcome, EngineError> {
        let ttl = continuation
            .expires_at
            .signed_duration_since(continuation.created_at)
            .to_std()
            .ok();
        let token = self
            .suspender
            .capture(ContinuationDraft::reissue(continuation), ttl)?;

        tracing::info!(
            flow = %continuation.flow,
            session_id = %continuation.session_id,
            from = %continuation.id,
            token = %token,
            point = %continuation.point,
            "Page revisited"
        );
        Ok(Outcome::Suspended(
            continuation.page.clone().respond(Some(token)),
        ))
    }

    fn settle(
        &self,
        origin: Origin,
        point: &str,
        ctx: FlowContext,
        result: Result<FrozenStep, FlowError>,
    ) -> Result<Outcome, EngineError> {
        let (attributes, terminal_page) = ctx.into_parts();

        if let Some(page) = terminal_page {
            let dropped = self.suspender.end_session(&origin.session_id);
            tracing::info!(
                flow = %origin.flow,
                session_id = %origin.session_id,
                page = %page.target,
                dropped,
                "Flow terminated"
            );
            return Ok(Outcome::Terminated(page.respond(None)));
        }

        match result {
            Err(source) => {
                tracing::error!(
                    flow = %origin.flow,
                    session_id = %origin.session_id,
                    point = %point,
                    error = %source,
                    "Flow code failed"
                );
                Err(EngineError::UserCode {
                    flow: origin.flow,
                    point: point.to_string(),
                    source,
                })
            }
            Ok(FrozenStep::Finish(page)) => {
                self.suspender.end_session(&origin.session_id);
                tracing::info!(
                    flow = %origin.flow,
                    session_id = %origin.session_id,
                    page = %page.target,
                    "Flow completed"
                );
                Ok(Outcome::Completed(page.respond(None)))
            }
            Ok(FrozenStep::Suspend {
                point,
                state,
                page,
                bookmark,
                ttl,
            }) => {
                let draft = ContinuationDraft {
                    session_id: origin.session_id,
                    flow: origin.flow.clone(),
                    root_id: origin.root,
                    parent_id: origin.parent,
                    bookmark,
                    point: point.clone(),
                    state,
                    attributes,
                    page: page.clone(),
                };
                let token = self.suspender.capture(draft, ttl)?;
                tracing::info!(
                    flow = %origin.flow,
                    session_id = %origin.session_id,
                    token = %token,
                    point = %point,
                    bookmark,
                    "Flow suspended"
                );
                Ok(Outcome::Suspended(page.respond(Some(token))))
            }
        }
    }
}

/// Run flow code, turning a panic into a flow error.
fn guarded(
    run: impl FnOnce() -> Result<FrozenStep, FlowError>,
) -> Result<FrozenStep, FlowError> {
    panic::catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|payload| Err(FlowError::Failed(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("flow panicked: {}", detail)
}
