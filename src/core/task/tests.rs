use super::*;
use crate::api::{EvaluationStatus, Section};
use crate::core::error::{codes, ApiError};
use crate::core::http::HttpResponse;
use crate::utils::test_utils::{
    error_body, sample_sections, section, sse_frame, FakeEventStream, FakeTransport,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::oneshot;

const GENERATE_PATH: &str = "/repos/octo/demo/generate/sse";
const GENERATE_FALLBACK_T1: &str = "/repos/fallback/generate/t1";

fn sections_json(sections: Vec<Section>) -> Value {
    serde_json::to_value(Sections { sections }).expect("sections serialize")
}

fn connected(task_id: &str) -> String {
    sse_frame("connected", &json!({ "taskId": task_id }))
}

fn fast_timeouts() -> TaskTimeouts {
    TaskTimeouts {
        connect: Duration::from_millis(500),
        task: Duration::from_millis(50),
    }
}

fn generate_request() -> GenerateRequest {
    GenerateRequest {
        branch: "main".to_string(),
    }
}

#[test]
fn store_keeps_the_first_delivered_result() {
    let store = TaskStore::<u32>::new();
    let key = TaskKey::new("generate", "octo", "demo");

    assert_eq!(store.apply_result(&key, 1), Delivery::Applied(1));
    assert_eq!(store.apply_result(&key, 2), Delivery::AlreadyApplied(1));
    assert_eq!(store.result(&key), Some(1));
}

#[test]
fn store_task_id_is_consumed_once() {
    let store = TaskStore::<u32>::new();
    let key = TaskKey::new("generate", "octo", "demo");

    store.set_task_id(&key, "t1");
    assert_eq!(store.take_task_id(&key).as_deref(), Some("t1"));
    assert_eq!(store.take_task_id(&key), None);
}

#[test]
fn store_keys_do_not_leak_between_repositories() {
    let store = TaskStore::<u32>::new();
    let demo = TaskKey::new("generate", "octo", "demo");
    let other = TaskKey::new("generate", "octo", "other");
    let evaluate = TaskKey::new("evaluate", "octo", "demo");

    store.set_task_id(&demo, "t1");
    store.apply_result(&demo, 7);

    assert_eq!(store.snapshot(&other), TaskSnapshot::default());
    assert_eq!(store.snapshot(&evaluate), TaskSnapshot::default());
}

#[tokio::test]
async fn evict_resets_state_for_subscribers() {
    let store = TaskStore::<u32>::new();
    let key = TaskKey::new("evaluate", "octo", "demo");
    let mut rx = store.subscribe(&key);

    store.set_task_id(&key, "t1");
    store.set_error(&key, ApiError::transport("boom"));
    rx.changed().await.expect("update");
    assert_eq!(rx.borrow_and_update().task_id.as_deref(), Some("t1"));

    store.evict(&key);
    rx.changed().await.expect("eviction");
    assert_eq!(*rx.borrow(), TaskSnapshot::default());
}

#[test]
fn clear_task_keeps_result() {
    let store = TaskStore::<u32>::new();
    let key = TaskKey::new("evaluate", "octo", "demo");
    let _observer = store.subscribe(&key);
    store.set_task_id(&key, "t1");
    store.apply_result(&key, 3);
    store.set_error(&key, ApiError::transport("late"));

    store.clear_task(&key);

    let snapshot = store.snapshot(&key);
    assert_eq!(snapshot.task_id, None);
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.result, Some(3));
}

#[test]
fn clear_task_without_observers_drops_the_entry() {
    let store = TaskStore::<u32>::new();
    let key = TaskKey::new("evaluate", "octo", "demo");
    store.set_task_id(&key, "t1");
    store.apply_result(&key, 3);

    store.clear_task(&key);

    assert_eq!(store.snapshot(&key), TaskSnapshot::default());
}

#[tokio::test]
async fn listener_delivers_success_and_records_task_id() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    transport.push_stream(FakeEventStream::Open(vec![
        connected("t1"),
        sse_frame(Generation::EVENT, &sections_json(sample_sections())),
    ]));
    let store = TaskStore::<Sections>::new();
    let key = TaskKey::new(Generation::KIND, "octo", "demo");
    let (tx, rx) = oneshot::channel();

    let mut handle = listen(
        &transport.client(),
        store.clone(),
        key.clone(),
        Generation::EVENT,
        TaskCallbacks::<Sections>::new()
            .on_success(move |sections| {
                let _ = tx.send(sections);
            })
            .on_error(|error| panic!("unexpected error: {error}")),
    );

    assert_eq!(handle.finished().await, ListenOutcome::Succeeded);
    let delivered = rx.await.expect("success callback");
    assert_eq!(delivered.sections, sample_sections());
    assert_eq!(store.task_id(&key).as_deref(), Some("t1"));
    assert_eq!(store.result(&key), Some(delivered));
    assert_eq!(transport.stream_opens(), 1);
}

#[tokio::test]
async fn listener_reassembles_events_split_across_chunks() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    let frame = sse_frame(
        DraftEvaluation::EVENT,
        &json!({"status": "GOOD", "rating": 4.5, "contents": ["Clear install steps"]}),
    );
    let (head, tail) = frame.split_at(12);
    transport.push_stream(FakeEventStream::Open(vec![head.to_string(), tail.to_string()]));
    let store = TaskStore::<Evaluation>::new();
    let key = TaskKey::new(DraftEvaluation::KIND, "octo", "demo");

    let mut handle = listen(
        &transport.client(),
        store.clone(),
        key.clone(),
        DraftEvaluation::EVENT,
        TaskCallbacks::new(),
    );

    assert_eq!(handle.finished().await, ListenOutcome::Succeeded);
    let evaluation = store.result(&key).expect("evaluation stored");
    assert_eq!(evaluation.status, EvaluationStatus::Good);
    assert!(evaluation.has_result());
}

#[tokio::test]
async fn listener_reports_error_event() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    transport.push_stream(FakeEventStream::Open(vec![
        connected("t1"),
        sse_frame("completion-generate-error", &error_body(500, "GENERATE_50001")),
    ]));
    let store = TaskStore::<Sections>::new();
    let key = TaskKey::new(Generation::KIND, "octo", "demo");
    let (tx, rx) = oneshot::channel();

    let mut handle = listen(
        &transport.client(),
        store.clone(),
        key.clone(),
        Generation::EVENT,
        TaskCallbacks::new().on_error(move |error| {
            let _ = tx.send(error);
        }),
    );

    assert_eq!(handle.finished().await, ListenOutcome::Failed);
    let error = rx.await.expect("error callback");
    assert_eq!(error.error_code, "GENERATE_50001");
    assert_eq!(store.error(&key), Some(error));
    assert_eq!(store.result(&key), None);
}

#[tokio::test]
async fn listener_leaves_task_pending_when_stream_drops() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    transport.push_stream(FakeEventStream::Closed(vec![connected("t1")]));
    let store = TaskStore::<Sections>::new();
    let key = TaskKey::new(Generation::KIND, "octo", "demo");

    let mut handle = listen(
        &transport.client(),
        store.clone(),
        key.clone(),
        Generation::EVENT,
        TaskCallbacks::<Sections>::new()
            .on_success(|_| panic!("no result was sent"))
            .on_error(|_| panic!("no error was sent")),
    );

    assert_eq!(handle.finished().await, ListenOutcome::Dropped);
    assert_eq!(store.task_id(&key).as_deref(), Some("t1"));
    assert_eq!(transport.stream_opens(), 1);
}

#[tokio::test]
async fn closing_the_handle_cancels_the_listener() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    let sender = transport.push_channel_stream();
    let store = TaskStore::<Sections>::new();
    let key = TaskKey::new(Generation::KIND, "octo", "demo");

    let mut handle = listen(
        &transport.client(),
        store.clone(),
        key.clone(),
        Generation::EVENT,
        TaskCallbacks::new(),
    );
    sender
        .send(Ok(connected("t1").into_bytes()))
        .expect("stream open");
    let mut rx = store.subscribe(&key);
    rx.wait_for(|snapshot| snapshot.task_id.is_some())
        .await
        .expect("task id");

    handle.close();
    assert_eq!(handle.finished().await, ListenOutcome::Cancelled);
    assert_eq!(handle.finished().await, ListenOutcome::Cancelled);
}

#[tokio::test]
async fn fallback_without_task_id_fails_without_network() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    let store = TaskStore::<Sections>::new();
    let key = TaskKey::new(Generation::KIND, "octo", "demo");

    let error = fallback::recover::<Generation>(&transport.client(), &store, &key)
        .await
        .expect_err("nothing to poll");

    assert_eq!(error.error_code, codes::TASK_ID_MISSING);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn fallback_does_not_overwrite_an_applied_result() {
    let transport = FakeTransport::new(|_| {
        HttpResponse::json(200, sections_json(vec![section(9, "Late", 1)]))
    });
    let store = TaskStore::<Sections>::new();
    let key = TaskKey::new(Generation::KIND, "octo", "demo");
    store.set_task_id(&key, "t1");
    store.apply_result(
        &key,
        Sections {
            sections: sample_sections(),
        },
    );

    let result = fallback::recover::<Generation>(&transport.client(), &store, &key)
        .await
        .expect("fallback");

    assert_eq!(result.sections, sample_sections());
    assert_eq!(transport.paths(), vec![GENERATE_FALLBACK_T1.to_string()]);
    assert_eq!(store.task_id(&key), None);
}

#[tokio::test]
async fn runner_uses_event_result_and_sends_task_id() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    transport.push_stream(FakeEventStream::Open(vec![
        connected("t1"),
        sse_frame(Generation::EVENT, &sections_json(sample_sections())),
    ]));
    let runner = TaskRunner::<Generation>::new(transport.client(), fast_timeouts());
    let observer = runner.store().subscribe(&runner.key("octo", "demo"));

    let result = runner
        .run("octo", "demo", &generate_request())
        .await
        .expect("generation");

    assert_eq!(result.sections, sample_sections());
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, GENERATE_PATH);
    assert_eq!(
        requests[0].query,
        vec![("taskId".to_string(), "t1".to_string())]
    );
    assert_eq!(requests[0].body, Some(json!({"branch": "main"})));

    let snapshot = observer.borrow().clone();
    assert_eq!(snapshot.task_id, None);
    assert_eq!(snapshot.result, Some(result));
}

#[tokio::test]
async fn runner_recovers_through_fallback_after_error_event() {
    let transport = FakeTransport::new(|request| {
        if request.path == GENERATE_FALLBACK_T1 {
            HttpResponse::json(200, sections_json(sample_sections()))
        } else {
            HttpResponse::no_content()
        }
    });
    transport.push_stream(FakeEventStream::Open(vec![
        connected("t1"),
        sse_frame("completion-generate-error", &error_body(500, "GENERATE_50001")),
    ]));
    let runner = TaskRunner::<Generation>::new(transport.client(), fast_timeouts());
    let observer = runner.store().subscribe(&runner.key("octo", "demo"));

    let result = runner
        .run("octo", "demo", &generate_request())
        .await
        .expect("fallback result");

    assert_eq!(result.sections, sample_sections());
    assert_eq!(transport.count(GENERATE_FALLBACK_T1), 1);
    let snapshot = observer.borrow().clone();
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.result, Some(result));
}

#[tokio::test]
async fn runner_reports_event_error_when_fallback_also_fails() {
    let transport = FakeTransport::new(|request| {
        if request.path == GENERATE_FALLBACK_T1 {
            HttpResponse::json(404, error_body(404, "TASK_40401"))
        } else {
            HttpResponse::no_content()
        }
    });
    transport.push_stream(FakeEventStream::Open(vec![
        connected("t1"),
        sse_frame("completion-generate-error", &error_body(500, "GENERATE_50001")),
    ]));
    let runner = TaskRunner::<Generation>::new(transport.client(), fast_timeouts());

    let error = runner
        .run("octo", "demo", &generate_request())
        .await
        .expect_err("both paths failed");

    assert_eq!(error.error_code, "GENERATE_50001");
}

#[tokio::test]
async fn runner_falls_back_when_start_request_fails() {
    let transport = FakeTransport::new(|request| match request.path.as_str() {
        "/repos/octo/demo/evaluate/draft/sse" => {
            HttpResponse::json(502, error_body(502, "EVALUATE_50201"))
        }
        "/repos/fallback/evaluate/draft/t9" => HttpResponse::json(
            200,
            json!({"status": "IMPROVEMENT", "rating": 2.0, "contents": ["Add usage"]}),
        ),
        _ => HttpResponse::no_content(),
    });
    transport.push_stream(FakeEventStream::Open(vec![connected("t9")]));
    let runner = TaskRunner::<DraftEvaluation>::new(transport.client(), fast_timeouts());
    let request = EvaluateDraftRequest {
        branch: "main".to_string(),
        content: "# Demo".to_string(),
    };

    let evaluation = runner
        .run("octo", "demo", &request)
        .await
        .expect("fallback evaluation");

    assert_eq!(evaluation.status, EvaluationStatus::Improvement);
    assert_eq!(evaluation.contents, Some(vec!["Add usage".to_string()]));
}

#[tokio::test]
async fn runner_returns_start_error_when_fallback_fails() {
    let transport = FakeTransport::new(|request| {
        if request.method == Method::POST {
            HttpResponse::json(502, error_body(502, "GENERATE_50201"))
        } else {
            HttpResponse::json(404, error_body(404, "TASK_40401"))
        }
    });
    transport.push_stream(FakeEventStream::Open(vec![connected("t1")]));
    let runner = TaskRunner::<Generation>::new(transport.client(), fast_timeouts());

    let error = runner
        .run("octo", "demo", &generate_request())
        .await
        .expect_err("start and fallback failed");

    assert_eq!(error.error_code, "GENERATE_50201");
    assert_eq!(transport.count(GENERATE_FALLBACK_T1), 1);
}

#[tokio::test]
async fn runner_falls_back_when_stream_drops_or_times_out() {
    for stream in [
        FakeEventStream::Closed(vec![connected("t1")]),
        FakeEventStream::Open(vec![connected("t1")]),
    ] {
        let transport = FakeTransport::new(|request| {
            if request.path == GENERATE_FALLBACK_T1 {
                HttpResponse::json(200, sections_json(sample_sections()))
            } else {
                HttpResponse::no_content()
            }
        });
        transport.push_stream(stream);
        let runner = TaskRunner::<Generation>::new(transport.client(), fast_timeouts());

        let result = runner
            .run("octo", "demo", &generate_request())
            .await
            .expect("fallback result");
        assert_eq!(result.sections.len(), 3);
        assert_eq!(transport.count(GENERATE_FALLBACK_T1), 1);
    }
}

#[tokio::test]
async fn runner_without_task_id_never_starts_the_job() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    transport.push_stream(FakeEventStream::Closed(vec![sse_frame(
        "connected",
        &json!({}),
    )]));
    let runner = TaskRunner::<Generation>::new(transport.client(), fast_timeouts());

    let error = runner
        .run("octo", "demo", &generate_request())
        .await
        .expect_err("no task id");

    assert_eq!(error.error_code, codes::TASK_NOT_STARTED);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn runner_evicts_previous_result_before_starting() {
    let transport = FakeTransport::new(|_| HttpResponse::no_content());
    transport.push_stream(FakeEventStream::Open(vec![
        connected("t2"),
        sse_frame(Generation::EVENT, &sections_json(vec![section(5, "Fresh", 1)])),
    ]));
    let runner = TaskRunner::<Generation>::new(transport.client(), fast_timeouts());
    let key = runner.key("octo", "demo");
    runner.store().apply_result(
        &key,
        Sections {
            sections: sample_sections(),
        },
    );

    let result = runner
        .run("octo", "demo", &generate_request())
        .await
        .expect("fresh result");

    assert_eq!(result.sections, vec![section(5, "Fresh", 1)]);
}
