// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! What the host framework's request and message types must expose.
//!
//! Span names are computed from these accessors; nothing else about the
//! request or message is inspected.

/// An RPC request addressed to a service endpoint.
pub trait Request {
    /// The name of the target service, e.g. `users`.
    fn service(&self) -> &str;
    /// The name of the target endpoint, e.g. `Get`.
    fn endpoint(&self) -> &str;
}

/// A fire-and-forget message published to a topic.
pub trait Message {
    /// The topic the message is published to, e.g. `orders.created`.
    fn topic(&self) -> &str;
}

impl<R: Request + ?Sized> Request for &R {
    fn service(&self) -> &str {
        (**self).service()
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

impl<M: Message + ?Sized> Message for &M {
    fn topic(&self) -> &str {
        (**self).topic()
    }
}
