use super::*;
use crate::{page::TextSurface, source::SourceResponse};
use async_trait::async_trait;
use shared::error::DecodeError;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::{mpsc, oneshot, Mutex};

type Gate = oneshot::Sender<Result<SourceResponse, FetchError>>;

/// Hands each call the next scripted response, released by the test.
struct ScriptedSource {
    pending: Mutex<VecDeque<oneshot::Receiver<Result<SourceResponse, FetchError>>>>,
    calls_made: AtomicUsize,
    calls: mpsc::UnboundedSender<usize>,
}

impl ScriptedSource {
    fn new(responses: usize) -> (Arc<Self>, Vec<Gate>, mpsc::UnboundedReceiver<usize>) {
        let mut gates = Vec::new();
        let mut pending = VecDeque::new();
        for _ in 0..responses {
            let (tx, rx) = oneshot::channel();
            gates.push(tx);
            pending.push_back(rx);
        }
        let (calls, calls_rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            pending: Mutex::new(pending),
            calls_made: AtomicUsize::new(0),
            calls,
        });
        (source, gates, calls_rx)
    }
}

#[async_trait]
impl TemperatureSource for ScriptedSource {
    async fn get(&self) -> Result<SourceResponse, FetchError> {
        let (index, gate) = {
            let mut pending = self.pending.lock().await;
            let index = self.calls_made.fetch_add(1, Ordering::SeqCst) + 1;
            (index, pending.pop_front())
        };
        let _ = self.calls.send(index);
        let Some(gate) = gate else {
            return Err(FetchError::Transport("no scripted response left".into()));
        };
        gate.await
            .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".into())))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct FixedSource(SourceResponse);

#[async_trait]
impl TemperatureSource for FixedSource {
    async fn get(&self) -> Result<SourceResponse, FetchError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "fixed".to_string()
    }
}

struct UnreachableSource;

#[async_trait]
impl TemperatureSource for UnreachableSource {
    async fn get(&self) -> Result<SourceResponse, FetchError> {
        Err(FetchError::Transport("connection refused".into()))
    }

    fn describe(&self) -> String {
        "unreachable".to_string()
    }
}

fn flat(temp: f64) -> Result<SourceResponse, FetchError> {
    Ok(SourceResponse::ok(format!(r#"{{"temp":{temp}}}"#)))
}

fn surface() -> Arc<TextSurface> {
    Arc::new(TextSurface::new("text", "Hello"))
}

#[tokio::test]
async fn nested_body_is_written_as_sentence() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse::ok(
            r#"{"becken":{"Bodensee":{"temp":21.5}}}"#,
        ))),
        display.clone(),
        FetchOptions::checked_nested(),
    );

    let outcome = handler.on_activation().await.expect("join").expect("fetch");

    assert!(matches!(outcome, FetchOutcome::Displayed { .. }));
    assert_eq!(display.text(), "Der Bodensee ist gerade 21.5° warm.");
}

#[tokio::test]
async fn flat_body_is_written_as_sentence() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse::ok(r#"{"temp":19}"#))),
        display.clone(),
        FetchOptions::unchecked_flat(),
    );

    handler.on_activation().await.expect("join").expect("fetch");

    assert_eq!(display.text(), "Der Bodensee ist gerade 19° warm.");
}

#[tokio::test]
async fn checked_status_leaves_display_unchanged_on_failure_status() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse {
            status: 503,
            body: br#"{"becken":{"Bodensee":{"temp":21.5}}}"#.to_vec(),
        })),
        display.clone(),
        FetchOptions::checked_nested(),
    );

    let err = handler.on_activation().await.expect("join").expect_err("status");

    assert!(matches!(err, FetchError::Status(503)));
    assert_eq!(display.text(), "Hello");
    assert_eq!(display.snapshot().revision, 0);
}

#[tokio::test]
async fn ignored_status_still_decodes_body() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse {
            status: 500,
            body: br#"{"temp":7.25}"#.to_vec(),
        })),
        display.clone(),
        FetchOptions::unchecked_flat(),
    );

    handler.on_activation().await.expect("join").expect("fetch");

    assert_eq!(display.text(), "Der Bodensee ist gerade 7.25° warm.");
}

#[tokio::test]
async fn missing_nested_field_fails_without_touching_display() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse::ok(r#"{"becken":"Bodensee","temp":33.3}"#))),
        display.clone(),
        FetchOptions::checked_nested(),
    );

    let err = handler
        .on_activation()
        .await
        .expect("task must not panic")
        .expect_err("missing field");

    assert!(matches!(
        err,
        FetchError::Decode(DecodeError::MissingField(ref path)) if path == "becken.Bodensee.temp"
    ));
    assert_eq!(display.text(), "Hello");
}

#[tokio::test]
async fn last_resolved_policy_keeps_the_slower_first_request() {
    let (source, gates, mut calls) = ScriptedSource::new(2);
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        source,
        display.clone(),
        FetchOptions::unchecked_flat().with_write_policy(WritePolicy::LastResolved),
    );
    let mut gates = gates.into_iter();
    let (first_gate, second_gate) = (gates.next().expect("gate 1"), gates.next().expect("gate 2"));

    let first = handler.on_activation();
    assert_eq!(calls.recv().await, Some(1));
    let second = handler.on_activation();
    assert_eq!(calls.recv().await, Some(2));

    second_gate.send(flat(21.0)).expect("release second");
    second.await.expect("join").expect("second fetch");
    assert_eq!(display.text(), "Der Bodensee ist gerade 21° warm.");

    first_gate.send(flat(18.5)).expect("release first");
    let outcome = first.await.expect("join").expect("first fetch");

    assert!(matches!(outcome, FetchOutcome::Displayed { seq: RequestSeq(1), .. }));
    assert_eq!(display.text(), "Der Bodensee ist gerade 18.5° warm.");
}

#[tokio::test]
async fn latest_triggered_policy_discards_the_slower_first_request() {
    let (source, gates, mut calls) = ScriptedSource::new(2);
    let display = surface();
    let handler = TemperatureFetchHandler::new(source, display.clone(), FetchOptions::unchecked_flat());
    let mut gates = gates.into_iter();
    let (first_gate, second_gate) = (gates.next().expect("gate 1"), gates.next().expect("gate 2"));

    let first = handler.on_activation();
    assert_eq!(calls.recv().await, Some(1));
    let second = handler.on_activation();
    assert_eq!(calls.recv().await, Some(2));

    second_gate.send(flat(21.0)).expect("release second");
    second.await.expect("join").expect("second fetch");
    first_gate.send(flat(18.5)).expect("release first");
    let outcome = first.await.expect("join").expect("first fetch");

    assert_eq!(outcome.seq(), RequestSeq(1));
    assert!(matches!(outcome, FetchOutcome::Stale { .. }));
    assert_eq!(outcome.reading().temp, 18.5);
    assert_eq!(display.text(), "Der Bodensee ist gerade 21° warm.");
    assert_eq!(handler.sequencer().highest_completed(), Some(RequestSeq(2)));
}

#[tokio::test]
async fn error_message_display_replaces_text_on_transport_failure() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(UnreachableSource),
        display.clone(),
        FetchOptions::unchecked_flat().with_error_display(ErrorDisplay::Message),
    );

    let err = handler.on_activation().await.expect("join").expect_err("transport");

    assert!(matches!(err, FetchError::Transport(_)));
    assert_eq!(display.text(), "Die Temperatur konnte nicht abgerufen werden.");
}

#[tokio::test]
async fn stale_failure_does_not_hide_newer_reading() {
    let (source, gates, mut calls) = ScriptedSource::new(2);
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        source,
        display.clone(),
        FetchOptions::unchecked_flat().with_error_display(ErrorDisplay::Message),
    );
    let mut gates = gates.into_iter();
    let (first_gate, second_gate) = (gates.next().expect("gate 1"), gates.next().expect("gate 2"));

    let first = handler.on_activation();
    assert_eq!(calls.recv().await, Some(1));
    let second = handler.on_activation();
    assert_eq!(calls.recv().await, Some(2));

    second_gate.send(flat(22.0)).expect("release second");
    second.await.expect("join").expect("second fetch");
    first_gate
        .send(Err(FetchError::Transport("reset by peer".into())))
        .expect("release first");
    first.await.expect("join").expect_err("first fails");

    assert_eq!(display.text(), "Der Bodensee ist gerade 22° warm.");
}

#[tokio::test]
async fn failed_newer_request_keeps_older_reading_stale() {
    let (source, gates, mut calls) = ScriptedSource::new(2);
    let display = surface();
    let handler = TemperatureFetchHandler::new(source, display.clone(), FetchOptions::unchecked_flat());
    let mut gates = gates.into_iter();
    let (first_gate, second_gate) = (gates.next().expect("gate 1"), gates.next().expect("gate 2"));

    let first = handler.on_activation();
    assert_eq!(calls.recv().await, Some(1));
    let second = handler.on_activation();
    assert_eq!(calls.recv().await, Some(2));

    second_gate
        .send(Err(FetchError::Transport("connection reset".into())))
        .expect("release second");
    second.await.expect("join").expect_err("second fails");
    first_gate.send(flat(18.5)).expect("release first");
    let outcome = first.await.expect("join").expect("first fetch");

    assert!(matches!(outcome, FetchOutcome::Stale { seq: RequestSeq(1), .. }));
    assert_eq!(display.text(), "Hello");
    assert_eq!(display.snapshot().revision, 0);
    assert_eq!(handler.sequencer().highest_completed(), Some(RequestSeq(2)));
}

#[tokio::test]
async fn error_message_display_reports_failure_status() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse {
            status: 503,
            body: br#"{"becken":{"Bodensee":{"temp":21.5}}}"#.to_vec(),
        })),
        display.clone(),
        FetchOptions::checked_nested().with_error_display(ErrorDisplay::Message),
    );

    let err = handler.on_activation().await.expect("join").expect_err("status");

    assert!(matches!(err, FetchError::Status(503)));
    assert_eq!(display.text(), "Der Server antwortete mit Status 503.");
}

#[tokio::test]
async fn error_message_display_reports_undecodable_body() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse::ok("<html>maintenance</html>"))),
        display.clone(),
        FetchOptions::unchecked_flat().with_error_display(ErrorDisplay::Message),
    );

    let err = handler.on_activation().await.expect("join").expect_err("decode");

    assert!(matches!(err, FetchError::Decode(DecodeError::InvalidJson(_))));
    assert_eq!(display.text(), "Die Antwort des Servers war unverständlich.");
}

#[tokio::test]
async fn custom_site_selects_nested_entry() {
    let display = surface();
    let handler = TemperatureFetchHandler::new(
        Arc::new(FixedSource(SourceResponse::ok(
            r#"{"becken":{"Bodensee":{"temp":21.5},"Zürichsee":{"temp":17}}}"#,
        ))),
        display.clone(),
        FetchOptions::checked_nested().with_site("Zürichsee"),
    );

    handler.on_activation().await.expect("join").expect("fetch");

    assert_eq!(display.text(), "Der Zürichsee ist gerade 17° warm.");
}
