// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! The tracer and propagation format handle shared by all wrappers.
//!
//! [`Telemetry`] resolves where spans come from and how trace context is
//! serialized once, at wrapper construction, instead of on every call. The
//! default resolves against the process-global OpenTelemetry registries,
//! which the host process configures at startup; tests and embedders can hand
//! in their own tracer provider and propagation format instead.

use std::fmt;
use std::sync::Arc;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{Status, TraceContextExt, Tracer, TracerProvider};

use crate::context::Context;
use crate::metadata::Metadata;
use crate::propagation::{MetadataExtractor, MetadataInjector};

/// The instrumentation scope name spans are created under.
const INSTRUMENTATION_NAME: &str = "otelmesh";

/// A handle to the tracer and propagation format used by the tracing
/// wrappers. Cheap to clone; read-only after construction, so it is safe to
/// share across however many requests are in flight.
#[derive(Clone)]
pub struct Telemetry {
    tracer: Arc<BoxedTracer>,
    propagator: Option<Arc<dyn TextMapPropagator + Send + Sync>>,
}

impl Telemetry {
    /// Returns a handle backed by the process-global tracer provider and
    /// propagation format.
    pub fn from_global() -> Self {
        Self {
            tracer: Arc::new(global::tracer(INSTRUMENTATION_NAME)),
            propagator: None,
        }
    }

    /// Returns a handle backed by an explicit tracer provider, still using
    /// the process-global propagation format.
    pub fn new<P>(provider: &P) -> Self
    where
        P: TracerProvider,
        P::Tracer: Send + Sync + 'static,
        <P::Tracer as Tracer>::Span: Send + Sync + 'static,
    {
        Self {
            tracer: Arc::new(BoxedTracer::new(Box::new(provider.tracer(INSTRUMENTATION_NAME)))),
            propagator: None,
        }
    }

    /// Sets an explicit propagation format, overriding the process-global one.
    pub fn with_propagator<P>(mut self, propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        self.propagator = Some(Arc::new(propagator));
        self
    }

    /// Serializes the trace context carried by `cx` into `metadata`,
    /// overwriting the propagation keys in place.
    pub fn inject_context(&self, cx: &opentelemetry::Context, metadata: &mut Metadata) {
        match &self.propagator {
            Some(propagator) => propagator.inject_context(cx, &mut MetadataInjector(metadata)),
            None => global::get_text_map_propagator(|propagator| {
                propagator.inject_context(cx, &mut MetadataInjector(metadata));
            }),
        }
    }

    /// Parses the remote trace context out of `metadata`, using `base` for
    /// anything the carrier does not provide.
    pub fn extract_context(&self, base: &opentelemetry::Context, metadata: &Metadata) -> opentelemetry::Context {
        match &self.propagator {
            Some(propagator) => propagator.extract_with_context(base, &MetadataExtractor(metadata)),
            None => global::get_text_map_propagator(|propagator| {
                propagator.extract_with_context(base, &MetadataExtractor(metadata))
            }),
        }
    }

    /// Starts a span named `name` as a child of `parent` and returns the
    /// context carrying it.
    pub(crate) fn start_with_context(&self, name: String, parent: &opentelemetry::Context) -> opentelemetry::Context {
        let span = self.tracer.start_with_context(name, parent);
        parent.with_span(span)
    }

    /// The remote parent for an inbound request: the trace context extracted
    /// from the carrier attached to `ctx`, or `ctx.trace` untouched when no
    /// carrier was attached.
    pub(crate) fn extract_parent(&self, ctx: &Context) -> opentelemetry::Context {
        match ctx.metadata.as_ref() {
            Some(metadata) => self.extract_context(&ctx.trace, metadata),
            None => {
                tracing::debug!("[OTELMESH] no metadata carrier attached to the inbound context");
                ctx.trace.clone()
            },
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::from_global()
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("propagator", &self.propagator.as_ref().map(|_| "custom").unwrap_or("global"))
            .finish_non_exhaustive()
    }
}

/// Records a failed result on the span carried by `cx` and ends the span.
///
/// The span ends exactly once on every return path; if the wrapped operation
/// unwinds instead of returning, dropping `cx` ends the span without an error
/// record.
pub(crate) fn close_span<T, E: std::error::Error>(cx: &opentelemetry::Context, result: &Result<T, E>) {
    let span = cx.span();
    if let Err(error) = result {
        span.record_error(error);
        span.set_status(Status::error(error.to_string()));
    }
    span.end();
}
