// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! Server-side seam and its tracing wrapper.
//!
//! [`Serve`] is the shape the host framework dispatches inbound requests
//! through; [`traced::TracedServe`] recovers the remote trace parent from the
//! request's metadata carrier and runs the handler under a child span.

pub mod traced;

pub use traced::TracedServe;

use crate::context::Context;
use crate::request::Request;

/// Types that handle one inbound request.
///
/// `serve` consumes `self`; frameworks that dispatch concurrently clone the
/// handler per request.
pub trait Serve: Sized {
    /// The request type.
    type Req: Request;
    /// The response type.
    type Resp;
    /// The error the handler fails with. Returned to the framework unchanged
    /// by the tracing wrapper.
    type Error: std::error::Error;

    /// Handles one request.
    async fn serve(self, ctx: Context, request: Self::Req) -> Result<Self::Resp, Self::Error>;
}
