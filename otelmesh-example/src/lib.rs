// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! A small greeter service used by the demo binary: an in-process loopback
//! "transport" carrying the metadata between a traced client stub and a
//! traced handler, plus OTLP tracing setup.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::Resource;
use otelmesh::client::{Publisher, Stub};
use otelmesh::server::Serve;
use otelmesh::{Context, Message, Metadata, Request};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the W3C propagation format and an OTLP span pipeline as the
/// process-global telemetry, and wires `tracing` output through both a
/// formatting layer and the OpenTelemetry layer.
pub fn init_tracing(service_name: &'static str) -> anyhow::Result<()> {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::new_exporter().tonic().build_span_exporter()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_resource(Resource::new([KeyValue::new(opentelemetry_semantic_conventions::resource::SERVICE_NAME, service_name)])),
        )
        .build();
    opentelemetry::global::set_tracer_provider(provider.clone());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name)))
        .try_init()?;
    Ok(())
}

/// A request for a greeting.
#[derive(Clone, Debug)]
pub struct GreetRequest {
    /// Who to greet.
    pub name: String,
}

impl Request for GreetRequest {
    fn service(&self) -> &str {
        "greeter"
    }

    fn endpoint(&self) -> &str {
        "Hello"
    }
}

/// Ways the greeter can fail.
#[derive(Debug, thiserror::Error)]
pub enum GreetError {
    /// The handler refuses to greet nobody.
    #[error("nobody to greet")]
    Nobody,
}

/// The greeter handler.
#[derive(Clone, Debug)]
pub struct HelloServe;

impl Serve for HelloServe {
    type Req = GreetRequest;
    type Resp = String;
    type Error = GreetError;

    async fn serve(self, _ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error> {
        if request.name.is_empty() {
            return Err(GreetError::Nobody);
        }
        Ok(format!("Hello, {}!", request.name))
    }
}

/// An in-process stand-in for a client transport: hands the request and its
/// metadata carrier to a server-side handler the way a network transport
/// would ship them to another process.
#[derive(Clone, Debug)]
pub struct Loopback<S> {
    serve: S,
}

impl<S> Loopback<S> {
    /// Returns a loopback transport dispatching to `serve`.
    pub fn new(serve: S) -> Self {
        Self { serve }
    }
}

impl<S> Stub for Loopback<S>
where
    S: Serve + Clone,
{
    type Req = S::Req;
    type Resp = S::Resp;
    type Error = S::Error;

    async fn call(&self, ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error> {
        let inbound = Context::current().with_deadline(ctx.deadline).with_metadata(ctx.metadata.clone().unwrap_or_else(Metadata::new));
        self.serve.clone().serve(inbound, request).await
    }
}

/// A notification about a greeting that was sent.
#[derive(Clone, Debug)]
pub struct Notice {
    /// The topic the notice goes out on.
    pub topic: String,
}

impl Message for Notice {
    fn topic(&self) -> &str {
        &self.topic
    }
}

/// A publisher that only logs what it would send.
#[derive(Clone, Debug)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    type Msg = Notice;
    type Error = std::convert::Infallible;

    async fn publish(&self, _ctx: Context, message: Self::Msg) -> Result<(), Self::Error> {
        tracing::info!("[OTELMESH] published to {}", message.topic);
        Ok(())
    }
}
