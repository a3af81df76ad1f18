// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! Client-side seams and their tracing wrappers.
//!
//! The traits here are the shapes the host RPC framework's client plugs in
//! with: [`Stub`] for single invocations, [`StreamStub`] for opening
//! bidirectional streams, [`Publisher`] for fire-and-forget sends, and
//! [`Attempt`] for one physical network try within a call. Each has a traced
//! counterpart in [`traced`] that adds span lifecycle and context
//! propagation without altering what the wrapped operation returns.

pub mod traced;

pub use traced::{TracedAttempt, TracedPublisher, TracedStreamStub, TracedStub};

use crate::context::Context;
use crate::request::{Message, Request};

/// Types that can call a remote service once per request.
pub trait Stub {
    /// The request type.
    type Req: Request;
    /// The response type.
    type Resp;
    /// The error the underlying client fails with. Returned to callers
    /// unchanged by every wrapper.
    type Error: std::error::Error;

    /// Invokes one RPC and awaits its response.
    async fn call(&self, ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error>;
}

/// Types that can open a bidirectional stream to a remote service.
pub trait StreamStub {
    /// The request type describing the stream to open.
    type Req: Request;
    /// The stream handle returned once the stream is open.
    type Stream;
    /// The error the underlying client fails with.
    type Error: std::error::Error;

    /// Opens a stream and returns its handle.
    async fn stream(&self, ctx: Context, request: Self::Req) -> Result<Self::Stream, Self::Error>;
}

/// Types that can publish a fire-and-forget message to a topic.
pub trait Publisher {
    /// The message type.
    type Msg: Message;
    /// The error the underlying publisher fails with.
    type Error: std::error::Error;

    /// Publishes one message.
    async fn publish(&self, ctx: Context, message: Self::Msg) -> Result<(), Self::Error>;
}

/// One physical network attempt within a call, as made by the transport
/// against a concrete endpoint. A retrying transport re-enters the attempt
/// with the same context, producing one span per try under the outer call
/// span.
pub trait Attempt {
    /// The request type.
    type Req: Request;
    /// The response type.
    type Resp;
    /// The error the underlying transport fails with.
    type Error: std::error::Error;

    /// Performs one network attempt.
    async fn attempt(&self, ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error>;
}
