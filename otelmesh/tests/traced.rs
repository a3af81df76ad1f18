use std::sync::{Arc, Mutex};

use opentelemetry::trace::{SpanId, Status};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use opentelemetry_sdk::trace::TracerProvider;
use otelmesh::client::{Attempt, Publisher, StreamStub, Stub, TracedAttempt, TracedPublisher, TracedStreamStub, TracedStub};
use otelmesh::server::{Serve, TracedServe};
use otelmesh::{Context, Message, Metadata, Request, Telemetry};

#[derive(Clone, Copy, Debug)]
struct EchoRequest {
    service: &'static str,
    endpoint: &'static str,
}

impl Request for EchoRequest {
    fn service(&self) -> &str {
        self.service
    }

    fn endpoint(&self) -> &str {
        self.endpoint
    }
}

#[derive(Clone, Copy, Debug)]
struct OrderEvent {
    topic: &'static str,
}

impl Message for OrderEvent {
    fn topic(&self) -> &str {
        self.topic
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct RpcError(String);

#[derive(Clone, Default)]
struct RecordingStub {
    carriers: Arc<Mutex<Vec<Option<Metadata>>>>,
}

impl Stub for RecordingStub {
    type Req = EchoRequest;
    type Resp = String;
    type Error = RpcError;

    async fn call(&self, ctx: Context, _request: Self::Req) -> Result<Self::Resp, Self::Error> {
        self.carriers.lock().unwrap().push(ctx.metadata.clone());
        Ok("ok".to_string())
    }
}

#[derive(Clone)]
struct FailingStub;

impl Stub for FailingStub {
    type Req = EchoRequest;
    type Resp = String;
    type Error = RpcError;

    async fn call(&self, _ctx: Context, _request: Self::Req) -> Result<Self::Resp, Self::Error> {
        Err(RpcError("not found".to_string()))
    }
}

#[derive(Clone)]
struct NullPublisher;

impl Publisher for NullPublisher {
    type Msg = OrderEvent;
    type Error = RpcError;

    async fn publish(&self, _ctx: Context, _message: Self::Msg) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Clone)]
struct WatchStub;

impl StreamStub for WatchStub {
    type Req = EchoRequest;
    type Stream = Vec<String>;
    type Error = RpcError;

    async fn stream(&self, _ctx: Context, _request: Self::Req) -> Result<Self::Stream, Self::Error> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Default)]
struct RecordingAttempt {
    carriers: Arc<Mutex<Vec<Option<Metadata>>>>,
}

impl Attempt for RecordingAttempt {
    type Req = EchoRequest;
    type Resp = String;
    type Error = RpcError;

    async fn attempt(&self, ctx: Context, _request: Self::Req) -> Result<Self::Resp, Self::Error> {
        self.carriers.lock().unwrap().push(ctx.metadata.clone());
        Ok("ok".to_string())
    }
}

#[derive(Clone)]
struct EchoServe;

impl Serve for EchoServe {
    type Req = EchoRequest;
    type Resp = String;
    type Error = RpcError;

    async fn serve(self, _ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error> {
        Ok(format!("{}.{}", request.service(), request.endpoint()))
    }
}

#[derive(Clone)]
struct FailingServe;

impl Serve for FailingServe {
    type Req = EchoRequest;
    type Resp = String;
    type Error = RpcError;

    async fn serve(self, _ctx: Context, _request: Self::Req) -> Result<Self::Resp, Self::Error> {
        Err(RpcError("permission denied".to_string()))
    }
}

fn users_get() -> EchoRequest {
    EchoRequest { service: "users", endpoint: "Get" }
}

/// A telemetry handle wired to an in-memory exporter, plus the provider that
/// must stay alive for the duration of the test.
fn test_telemetry() -> (Telemetry, InMemorySpanExporter, TracerProvider) {
    let exporter = InMemorySpanExporter::default();
    let provider = TracerProvider::builder().with_simple_exporter(exporter.clone()).build();
    let telemetry = Telemetry::new(&provider).with_propagator(TraceContextPropagator::new());
    (telemetry, exporter, provider)
}

fn finished(exporter: &InMemorySpanExporter) -> Vec<SpanData> {
    exporter.get_finished_spans().expect("in-memory exporter never fails")
}

fn span_named<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans
        .iter()
        .find(|span| span.name == name)
        .unwrap_or_else(|| panic!("no span named {name:?} among {:?}", spans.iter().map(|s| s.name.clone()).collect::<Vec<_>>()))
}

fn has_error_record(span: &SpanData) -> bool {
    span.events.iter().any(|event| event.name == "exception")
}

#[tokio::test]
async fn call_span_is_named_after_service_and_endpoint() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let stub = TracedStub::with_telemetry(RecordingStub::default(), telemetry);

    stub.call(Context::current(), users_get()).await.unwrap();

    let spans = finished(&exporter);
    assert_eq!(spans.len(), 1);
    let span = span_named(&spans, "call.users.Get");
    assert_eq!(span.status, Status::Unset);
    assert!(!has_error_record(span));
}

#[tokio::test]
async fn call_error_is_recorded_and_returned_unchanged() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let stub = TracedStub::with_telemetry(FailingStub, telemetry);

    let err = stub.call(Context::current(), users_get()).await.unwrap_err();
    assert_eq!(err.to_string(), "not found");

    let spans = finished(&exporter);
    let span = span_named(&spans, "call.users.Get");
    assert_eq!(span.status, Status::error("not found"));
    assert!(has_error_record(span));
}

#[tokio::test]
async fn every_invocation_ends_its_span() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let ok = TracedStub::with_telemetry(RecordingStub::default(), telemetry.clone());
    let failing = TracedStub::with_telemetry(FailingStub, telemetry);

    ok.call(Context::current(), users_get()).await.unwrap();
    failing.call(Context::current(), users_get()).await.unwrap_err();
    failing.call(Context::current(), users_get()).await.unwrap_err();

    assert_eq!(finished(&exporter).len(), 3);
}

#[tokio::test]
async fn publish_span_is_named_after_topic() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let publisher = TracedPublisher::with_telemetry(NullPublisher, telemetry);

    publisher.publish(Context::current(), OrderEvent { topic: "orders.created" }).await.unwrap();

    let spans = finished(&exporter);
    let span = span_named(&spans, "Pub to orders.created");
    assert_eq!(span.status, Status::Unset);
}

#[tokio::test]
async fn stream_open_span_omits_the_call_prefix() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let stub = TracedStreamStub::with_telemetry(WatchStub, telemetry);

    stub.stream(Context::current(), EchoRequest { service: "users", endpoint: "Watch" }).await.unwrap();

    let spans = finished(&exporter);
    span_named(&spans, "users.Watch");
}

#[tokio::test]
async fn attempt_span_does_not_touch_the_carrier() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let attempt = RecordingAttempt::default();
    let traced = TracedAttempt::with_telemetry(attempt.clone(), telemetry);

    traced.attempt(Context::current(), users_get()).await.unwrap();

    let carriers = attempt.carriers.lock().unwrap();
    assert_eq!(carriers.len(), 1);
    assert!(carriers[0].is_none());
    let spans = finished(&exporter);
    span_named(&spans, "users.Get");
}

#[tokio::test]
async fn outbound_call_injects_the_active_span() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let inner = RecordingStub::default();
    let stub = TracedStub::with_telemetry(inner.clone(), telemetry);

    stub.call(Context::current(), users_get()).await.unwrap();

    let carriers = inner.carriers.lock().unwrap();
    let metadata = carriers[0].as_ref().expect("carrier created on inject");
    let traceparent = metadata.get_or_empty("traceparent").to_string();
    let spans = finished(&exporter);
    let span = span_named(&spans, "call.users.Get");
    assert!(traceparent.contains(&span.span_context.trace_id().to_string()));
    assert!(traceparent.contains(&span.span_context.span_id().to_string()));
}

#[tokio::test]
async fn handle_span_parents_under_the_remote_caller() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let inner = RecordingStub::default();
    let stub = TracedStub::with_telemetry(inner.clone(), telemetry.clone());
    stub.call(Context::current(), users_get()).await.unwrap();
    let inbound = inner.carriers.lock().unwrap()[0].clone().expect("carrier created on inject");

    let serve = TracedServe::with_telemetry(EchoServe, telemetry);
    let response = serve.serve(Context::current().with_metadata(inbound), users_get()).await.unwrap();
    assert_eq!(response, "users.Get");

    let spans = finished(&exporter);
    let call = span_named(&spans, "call.users.Get");
    let handle = span_named(&spans, "handle.users.Get");
    assert_eq!(handle.span_context.trace_id(), call.span_context.trace_id());
    assert_eq!(handle.parent_span_id, call.span_context.span_id());
}

#[tokio::test]
async fn handle_without_a_carrier_still_traces() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let serve = TracedServe::with_telemetry(EchoServe, telemetry);

    serve.serve(Context::current(), users_get()).await.unwrap();

    let spans = finished(&exporter);
    let span = span_named(&spans, "handle.users.Get");
    assert_eq!(span.parent_span_id, SpanId::INVALID);
    assert_eq!(span.status, Status::Unset);
}

#[tokio::test]
async fn handler_error_is_recorded_and_returned_unchanged() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let serve = TracedServe::with_telemetry(FailingServe, telemetry);

    let err = serve.serve(Context::current(), users_get()).await.unwrap_err();
    assert_eq!(err.to_string(), "permission denied");

    let spans = finished(&exporter);
    let span = span_named(&spans, "handle.users.Get");
    assert_eq!(span.status, Status::error("permission denied"));
    assert!(has_error_record(span));
}

#[tokio::test]
async fn concurrent_calls_use_independent_carriers() {
    let (telemetry, exporter, _provider) = test_telemetry();
    let inner = RecordingStub::default();
    let stub = TracedStub::with_telemetry(inner.clone(), telemetry);

    let (first, second) = futures::join!(stub.call(Context::current(), users_get()), stub.call(Context::current(), users_get()));
    first.unwrap();
    second.unwrap();

    let carriers = inner.carriers.lock().unwrap();
    let headers: Vec<String> = carriers
        .iter()
        .map(|metadata| metadata.as_ref().expect("each call gets its own carrier").get_or_empty("traceparent").to_string())
        .collect();
    assert_eq!(headers.len(), 2);
    assert_ne!(headers[0], headers[1]);

    // Each carrier names exactly its own call's span.
    for span in finished(&exporter) {
        let span_id = span.span_context.span_id().to_string();
        assert_eq!(headers.iter().filter(|header| header.contains(&span_id)).count(), 1);
    }
}
