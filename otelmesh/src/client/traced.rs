// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! Tracing wrappers for the outbound client seams.
//!
//! All four wrappers follow one pattern: name a span after the operation,
//! start it as a child of the context's current trace state, make the
//! span-bearing context visible to the peer (injection into the metadata
//! carrier, except for per-attempt spans, which ride the carrier the outer
//! call already injected), run the wrapped operation, record any error it
//! returns, and end the span on every exit path. The wrapped operation's
//! result is returned unmodified.

use crate::client::{Attempt, Publisher, StreamStub, Stub};
use crate::context::Context;
use crate::metadata::Metadata;
use crate::request::{Message, Request};
use crate::telemetry::{close_span, Telemetry};

/// Wraps a [`Stub`], tracing each call under a `call.<service>.<endpoint>`
/// span and injecting the span's trace context into the outgoing metadata
/// carrier.
#[derive(Clone, Debug)]
pub struct TracedStub<S> {
    inner: S,
    telemetry: Telemetry,
}

impl<S> TracedStub<S> {
    /// Wraps `inner` using the process-global telemetry registries.
    pub fn new(inner: S) -> Self {
        Self::with_telemetry(inner, Telemetry::from_global())
    }

    /// Wraps `inner` with an explicit [`Telemetry`] handle.
    pub fn with_telemetry(inner: S, telemetry: Telemetry) -> Self {
        Self { inner, telemetry }
    }

    /// Returns the wrapped stub.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Stub> Stub for TracedStub<S> {
    type Req = S::Req;
    type Resp = S::Resp;
    type Error = S::Error;

    async fn call(&self, mut ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error> {
        let name = format!("call.{}.{}", request.service(), request.endpoint());
        let cx = self.telemetry.start_with_context(name, &ctx.trace);
        ctx.trace = cx.clone();
        self.telemetry.inject_context(&cx, ctx.metadata.get_or_insert_with(Metadata::new));
        let result = self.inner.call(ctx, request).await;
        close_span(&cx, &result);
        result
    }
}

/// Wraps a [`StreamStub`], tracing each stream open under a
/// `<service>.<endpoint>` span and injecting the span's trace context into
/// the outgoing metadata carrier. The span covers the open, not the life of
/// the returned stream.
#[derive(Clone, Debug)]
pub struct TracedStreamStub<S> {
    inner: S,
    telemetry: Telemetry,
}

impl<S> TracedStreamStub<S> {
    /// Wraps `inner` using the process-global telemetry registries.
    pub fn new(inner: S) -> Self {
        Self::with_telemetry(inner, Telemetry::from_global())
    }

    /// Wraps `inner` with an explicit [`Telemetry`] handle.
    pub fn with_telemetry(inner: S, telemetry: Telemetry) -> Self {
        Self { inner, telemetry }
    }

    /// Returns the wrapped stub.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StreamStub> StreamStub for TracedStreamStub<S> {
    type Req = S::Req;
    type Stream = S::Stream;
    type Error = S::Error;

    async fn stream(&self, mut ctx: Context, request: Self::Req) -> Result<Self::Stream, Self::Error> {
        let name = format!("{}.{}", request.service(), request.endpoint());
        let cx = self.telemetry.start_with_context(name, &ctx.trace);
        ctx.trace = cx.clone();
        self.telemetry.inject_context(&cx, ctx.metadata.get_or_insert_with(Metadata::new));
        let result = self.inner.stream(ctx, request).await;
        close_span(&cx, &result);
        result
    }
}

/// Wraps a [`Publisher`], tracing each publish under a `Pub to <topic>` span
/// and injecting the span's trace context into the outgoing metadata carrier.
#[derive(Clone, Debug)]
pub struct TracedPublisher<P> {
    inner: P,
    telemetry: Telemetry,
}

impl<P> TracedPublisher<P> {
    /// Wraps `inner` using the process-global telemetry registries.
    pub fn new(inner: P) -> Self {
        Self::with_telemetry(inner, Telemetry::from_global())
    }

    /// Wraps `inner` with an explicit [`Telemetry`] handle.
    pub fn with_telemetry(inner: P, telemetry: Telemetry) -> Self {
        Self { inner, telemetry }
    }

    /// Returns the wrapped publisher.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Publisher> Publisher for TracedPublisher<P> {
    type Msg = P::Msg;
    type Error = P::Error;

    async fn publish(&self, mut ctx: Context, message: Self::Msg) -> Result<(), Self::Error> {
        let name = format!("Pub to {}", message.topic());
        let cx = self.telemetry.start_with_context(name, &ctx.trace);
        ctx.trace = cx.clone();
        self.telemetry.inject_context(&cx, ctx.metadata.get_or_insert_with(Metadata::new));
        let result = self.inner.publish(ctx, message).await;
        close_span(&cx, &result);
        result
    }
}

/// Wraps an [`Attempt`], tracing each network try under a
/// `<service>.<endpoint>` span. The carrier is left alone: the outer call
/// wrapper already injected the trace context the peer should see.
#[derive(Clone, Debug)]
pub struct TracedAttempt<A> {
    inner: A,
    telemetry: Telemetry,
}

impl<A> TracedAttempt<A> {
    /// Wraps `inner` using the process-global telemetry registries.
    pub fn new(inner: A) -> Self {
        Self::with_telemetry(inner, Telemetry::from_global())
    }

    /// Wraps `inner` with an explicit [`Telemetry`] handle.
    pub fn with_telemetry(inner: A, telemetry: Telemetry) -> Self {
        Self { inner, telemetry }
    }

    /// Returns the wrapped attempt.
    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: Attempt> Attempt for TracedAttempt<A> {
    type Req = A::Req;
    type Resp = A::Resp;
    type Error = A::Error;

    async fn attempt(&self, mut ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error> {
        let name = format!("{}.{}", request.service(), request.endpoint());
        let cx = self.telemetry.start_with_context(name, &ctx.trace);
        ctx.trace = cx.clone();
        let result = self.inner.attempt(ctx, request).await;
        close_span(&cx, &result);
        result
    }
}
