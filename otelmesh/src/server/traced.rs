// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! Tracing wrapper for the inbound dispatch seam.

use crate::context::Context;
use crate::request::Request;
use crate::server::Serve;
use crate::telemetry::{close_span, Telemetry};

/// Wraps a [`Serve`], tracing each inbound request under a
/// `handle.<service>.<endpoint>` span parented by the remote trace context
/// extracted from the request's metadata carrier.
///
/// Extraction runs before the span starts and before any handler code; a
/// missing or malformed carrier degrades to an un-parented span, never to a
/// failed request.
#[derive(Clone, Debug)]
pub struct TracedServe<S> {
    inner: S,
    telemetry: Telemetry,
}

impl<S> TracedServe<S> {
    /// Wraps `inner` using the process-global telemetry registries.
    pub fn new(inner: S) -> Self {
        Self::with_telemetry(inner, Telemetry::from_global())
    }

    /// Wraps `inner` with an explicit [`Telemetry`] handle.
    pub fn with_telemetry(inner: S, telemetry: Telemetry) -> Self {
        Self { inner, telemetry }
    }

    /// Returns the wrapped handler.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Serve> Serve for TracedServe<S> {
    type Req = S::Req;
    type Resp = S::Resp;
    type Error = S::Error;

    async fn serve(self, mut ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error> {
        let Self { inner, telemetry } = self;
        let name = format!("handle.{}.{}", request.service(), request.endpoint());
        let parent = telemetry.extract_parent(&ctx);
        let cx = telemetry.start_with_context(name, &parent);
        ctx.trace = cx.clone();
        let result = inner.serve(ctx, request).await;
        close_span(&cx, &result);
        result
    }
}
