//! End-to-end page flows driven through the session controller.

use pageflow::builder::EngineBuilder;
use pageflow::checkpoint::Checkpoint;
use pageflow::controller::{FlowRequest, Reply, ReplyKind, SessionController};
use pageflow::core::{ManualClock, Page, UserInput};
use pageflow::flow::{Flow, FlowContext, FlowError, Step, Suspension};
use pageflow::impl_state;
use pageflow::store::{ContinuationStore, MemoryContinuationStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// Registration wizard: three pages, then a summary.

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Registration {
    AskA,
    AskB { a: String },
    AskC { a: String, b: String },
}

impl_state!(Registration { AskA, AskB, AskC });

struct RegistrationFlow;

impl Flow for RegistrationFlow {
    type State = Registration;

    fn start(&self, ctx: &mut FlowContext) -> Result<Step<Registration>, FlowError> {
        ctx.set_attribute("pages_seen", 1)?;
        Ok(Step::suspend(Registration::AskA, Page::new("register/a")))
    }

    fn resume(
        &self,
        state: Registration,
        _input: &UserInput,
        ctx: &mut FlowContext,
    ) -> Result<Step<Registration>, FlowError> {
        let seen: u32 = ctx.attribute_as("pages_seen")?.unwrap_or(0);
        ctx.set_attribute("pages_seen", seen + 1)?;

        match state {
            Registration::AskA => {
                let a = ctx.require_text("a")?.to_string();
                Ok(Step::suspend(
                    Registration::AskB { a },
                    Page::new("register/b"),
                ))
            }
            Registration::AskB { a } => {
                let b = ctx.require_text("b")?.to_string();
                Ok(Step::suspend(
                    Registration::AskC { a, b },
                    Page::new("register/c"),
                ))
            }
            Registration::AskC { a, b } => {
                let c = ctx.require_text("c")?;
                Ok(Step::finish(
                    Page::new("register/summary")
                        .with("a", a)
                        .with("b", b)
                        .with("c", c)
                        .with("pages_seen", seen),
                ))
            }
        }
    }
}

// A flow that answers immediately.

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Nothing {
    Never,
}

impl_state!(Nothing { Never });

struct AboutFlow;

impl Flow for AboutFlow {
    type State = Nothing;

    fn start(&self, ctx: &mut FlowContext) -> Result<Step<Nothing>, FlowError> {
        let lang = ctx.input().text("lang").unwrap_or("en").to_string();
        Ok(Step::finish(Page::new("about").with("lang", lang)))
    }

    fn resume(
        &self,
        _state: Nothing,
        _input: &UserInput,
        _ctx: &mut FlowContext,
    ) -> Result<Step<Nothing>, FlowError> {
        Err(FlowError::failed("about never suspends"))
    }
}

// Upload with a quota check buried in a helper that can end the session.

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Upload {
    Form,
    Review { size: usize },
}

impl_state!(Upload { Form, Review } transient: [Review]);

struct UploadFlow {
    quota: usize,
}

impl UploadFlow {
    fn enforce_quota(&self, size: usize, ctx: &mut FlowContext) {
        if size > self.quota {
            ctx.terminate(
                Page::new("upload/rejected")
                    .with("size", size)
                    .with("quota", self.quota),
            );
        }
    }
}

impl Flow for UploadFlow {
    type State = Upload;

    fn start(&self, _ctx: &mut FlowContext) -> Result<Step<Upload>, FlowError> {
        Ok(Step::suspend(Upload::Form, Page::new("upload/form")))
    }

    fn resume(
        &self,
        state: Upload,
        input: &UserInput,
        ctx: &mut FlowContext,
    ) -> Result<Step<Upload>, FlowError> {
        match state {
            Upload::Form => {
                let file = input
                    .file("document")
                    .ok_or_else(|| FlowError::MissingInput("document".to_string()))?;
                let size = file.bytes.len();
                self.enforce_quota(size, ctx);
                // Ignored when the quota check ended the session.
                Ok(Suspension::new(
                    Upload::Review { size },
                    Page::new("upload/review").with("size", size),
                )
                .into())
            }
            Upload::Review { size } => {
                if input.text("confirm") == Some("yes") {
                    Ok(Step::finish(Page::new("upload/stored").with("size", size)))
                } else {
                    Ok(Step::suspend(Upload::Form, Page::new("upload/form")))
                }
            }
        }
    }
}

// A one-time code that must be used straight away.

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Otp {
    Code,
}

impl_state!(Otp { Code });

struct OtpFlow;

impl Flow for OtpFlow {
    type State = Otp;

    fn start(&self, _ctx: &mut FlowContext) -> Result<Step<Otp>, FlowError> {
        Ok(Suspension::new(Otp::Code, Page::new("otp/code"))
            .ttl(Duration::ZERO)
            .into())
    }

    fn resume(
        &self,
        _state: Otp,
        _input: &UserInput,
        _ctx: &mut FlowContext,
    ) -> Result<Step<Otp>, FlowError> {
        Ok(Step::finish(Page::new("otp/ok")))
    }
}

fn engine(clock: Arc<ManualClock>) -> (SessionController, Arc<MemoryContinuationStore>) {
    let store = Arc::new(
        MemoryContinuationStore::with_clock(clock).with_default_ttl(Duration::from_secs(600)),
    );
    let controller = EngineBuilder::new()
        .store(store.clone())
        .flow("register", RegistrationFlow)
        .flow("about", AboutFlow)
        .flow("upload", UploadFlow { quota: 4 })
        .flow("otp", OtpFlow)
        .entry_point("register")
        .entry_point("upload")
        .build()
        .unwrap();
    (controller, store)
}

fn resume(controller: &SessionController, reply: &Reply, input: UserInput) -> Reply {
    let token = reply.token().cloned().expect("reply should carry a token");
    controller.handle(FlowRequest::resume(token).with_input(input))
}

fn text(key: &str, value: &str) -> UserInput {
    UserInput::new().with_text(key, value)
}

fn document(size: usize) -> UserInput {
    UserInput::new().with_file(
        "document",
        pageflow::core::Upload {
            filename: "scan.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0; size],
        },
    )
}

#[test]
fn wizard_sees_each_input_in_order() {
    let (controller, store) = engine(Arc::new(ManualClock::starting_now()));

    let a = controller.handle(FlowRequest::start("register"));
    assert_eq!(a.target_page(), "register/a");
    let b = resume(&controller, &a, text("a", "1"));
    assert_eq!(b.target_page(), "register/b");
    let c = resume(&controller, &b, text("b", "2"));
    assert_eq!(c.target_page(), "register/c");
    let summary = resume(&controller, &c, text("c", "3"));

    assert_eq!(summary.kind, ReplyKind::Completed);
    assert_eq!(summary.page.model_value("a"), Some(&json!("1")));
    assert_eq!(summary.page.model_value("b"), Some(&json!("2")));
    assert_eq!(summary.page.model_value("c"), Some(&json!("3")));
    assert_eq!(summary.page.model_value("pages_seen"), Some(&json!(3)));
    assert!(summary.token().is_none());
    assert!(store.is_empty());
}

#[test]
fn flow_without_suspension_completes_in_one_request() {
    let (controller, store) = engine(Arc::new(ManualClock::starting_now()));

    let reply = controller.handle(FlowRequest::start("about").with_input(text("lang", "fr")));

    assert_eq!(reply.kind, ReplyKind::Completed);
    assert_eq!(reply.page.model_value("lang"), Some(&json!("fr")));
    assert!(store.is_empty());
}

#[test]
fn token_cannot_be_used_twice() {
    let (controller, _store) = engine(Arc::new(ManualClock::starting_now()));

    let a = controller.handle(FlowRequest::start("register"));
    let b = resume(&controller, &a, text("a", "1"));
    assert_eq!(b.kind, ReplyKind::Suspended);

    let replay = resume(&controller, &a, text("a", "other"));
    assert_eq!(replay.kind, ReplyKind::Expired);
    assert_eq!(replay.target_page(), "flow/expired");
}

#[test]
fn quota_helper_ends_the_session() {
    let (controller, store) = engine(Arc::new(ManualClock::starting_now()));

    let form = controller.handle(FlowRequest::start("upload"));
    let rejected = resume(&controller, &form, document(16));

    assert_eq!(rejected.kind, ReplyKind::Terminated);
    assert_eq!(rejected.target_page(), "upload/rejected");
    assert_eq!(rejected.page.model_value("size"), Some(&json!(16)));
    assert!(rejected.token().is_none());
    assert!(store.is_empty());

    let again = resume(&controller, &form, document(1));
    assert_eq!(again.kind, ReplyKind::Expired);
}

#[test]
fn upload_within_quota_is_stored() {
    let (controller, store) = engine(Arc::new(ManualClock::starting_now()));

    let form = controller.handle(FlowRequest::start("upload"));
    let review = resume(&controller, &form, document(3));
    assert_eq!(review.target_page(), "upload/review");

    let stored = resume(&controller, &review, text("confirm", "yes"));
    assert_eq!(stored.kind, ReplyKind::Completed);
    assert_eq!(stored.page.model_value("size"), Some(&json!(3)));
    assert!(store.is_empty());
}

#[test]
fn zero_ttl_continuation_is_immediately_unreachable() {
    let (controller, _store) = engine(Arc::new(ManualClock::starting_now()));

    let code = controller.handle(FlowRequest::start("otp"));
    assert_eq!(code.kind, ReplyKind::Suspended);

    let reply = resume(&controller, &code, UserInput::new());
    assert_eq!(reply.kind, ReplyKind::Expired);
}

#[test]
fn continuation_expires_after_default_ttl() {
    let clock = Arc::new(ManualClock::starting_now());
    let (controller, _store) = engine(clock.clone());

    let a = controller.handle(FlowRequest::start("register"));
    clock.advance(chrono::Duration::seconds(599));
    let b = resume(&controller, &a, text("a", "1"));
    assert_eq!(b.kind, ReplyKind::Suspended);

    clock.advance(chrono::Duration::seconds(600));
    let c = resume(&controller, &b, text("b", "2"));
    assert_eq!(c.kind, ReplyKind::Expired);
}

#[test]
fn user_error_can_be_corrected() {
    let (controller, _store) = engine(Arc::new(ManualClock::starting_now()));

    let form = controller.handle(FlowRequest::start("upload"));
    let error = resume(&controller, &form, text("note", "forgot the file"));

    assert_eq!(error.kind, ReplyKind::Error);
    assert_eq!(error.page.model_value("flow"), Some(&json!("upload")));
    assert_eq!(error.token(), form.token());

    let review = resume(&controller, &error, document(2));
    assert_eq!(review.target_page(), "upload/review");
}

#[test]
fn back_button_replays_earlier_page() {
    let (controller, _store) = engine(Arc::new(ManualClock::starting_now()));

    let a = controller.handle(FlowRequest::start("register"));
    let b = resume(&controller, &a, text("a", "1"));
    let c = resume(&controller, &b, text("b", "2"));

    let back = controller.handle_back(c.token().unwrap());
    assert_eq!(back.kind, ReplyKind::Suspended);
    assert_eq!(back.target_page(), "register/b");
    assert_ne!(back.token(), b.token());

    // The replayed page branches the flow with a different answer.
    let c2 = resume(&controller, &back, text("b", "two"));
    let summary = resume(&controller, &c2, text("c", "3"));
    assert_eq!(summary.page.model_value("b"), Some(&json!("two")));
}

#[test]
fn back_button_skips_transient_review_page() {
    let (controller, _store) = engine(Arc::new(ManualClock::starting_now()));

    let form = controller.handle(FlowRequest::start("upload"));
    let review = resume(&controller, &form, document(2));
    let form_again = resume(&controller, &review, text("confirm", "no"));
    assert_eq!(form_again.target_page(), "upload/form");

    // Review is transient, so back from the second form lands on the first.
    let back = controller.handle_back(form_again.token().unwrap());
    assert_eq!(back.target_page(), "upload/form");
    assert_eq!(back.kind, ReplyKind::Suspended);
}

#[test]
fn back_from_first_page_renders_expired() {
    let (controller, _store) = engine(Arc::new(ManualClock::starting_now()));

    let a = controller.handle(FlowRequest::start("register"));
    let back = controller.handle_back(a.token().unwrap());

    assert_eq!(back.kind, ReplyKind::Expired);
}

#[test]
fn checkpoint_moves_suspended_flows_between_stores() {
    let clock = Arc::new(ManualClock::starting_now());
    let (first, first_store) = engine(clock.clone());

    let a = first.handle(FlowRequest::start("register"));
    let b = resume(&first, &a, text("a", "1"));

    let json = first_store.checkpoint().to_json().unwrap();
    let bytes = Checkpoint::from_json(&json).unwrap().to_bytes().unwrap();

    let (second, second_store) = engine(clock);
    let restored = second_store
        .restore(&Checkpoint::from_bytes(&bytes).unwrap())
        .unwrap();
    assert_eq!(restored, 2);

    let c = resume(&second, &b, text("b", "2"));
    let summary = resume(&second, &c, text("c", "3"));
    assert_eq!(summary.kind, ReplyKind::Completed);
    assert_eq!(summary.page.model_value("a"), Some(&json!("1")));

    // The used token stays used after the move.
    let replay = resume(&second, &a, text("a", "again"));
    assert_eq!(replay.kind, ReplyKind::Expired);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_stay_isolated() {
    let (controller, store) = engine(Arc::new(ManualClock::starting_now()));
    let controller = Arc::new(controller);

    let sessions: Vec<_> = (0..16)
        .map(|i| {
            let controller = Arc::clone(&controller);
            tokio::task::spawn_blocking(move || {
                let id = i.to_string();
                let a = controller.handle(FlowRequest::start("register"));
                let b = resume(&controller, &a, text("a", &format!("a{}", id)));
                let c = resume(&controller, &b, text("b", &format!("b{}", id)));
                let summary = resume(&controller, &c, text("c", &format!("c{}", id)));
                (id, summary)
            })
        })
        .collect();

    for session in sessions {
        let (id, summary) = session.await.unwrap();
        assert_eq!(summary.kind, ReplyKind::Completed);
        assert_eq!(summary.page.model_value("a"), Some(&json!(format!("a{}", id))));
        assert_eq!(summary.page.model_value("b"), Some(&json!(format!("b{}", id))));
        assert_eq!(summary.page.model_value("c"), Some(&json!(format!("c{}", id))));
    }

    assert!(store.is_empty());
}
