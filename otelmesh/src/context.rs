// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! The call context passed through every traced operation.
//!
//! A [`Context`] travels with one RPC call, stream open, publish, or inbound
//! request. It carries the request deadline, the active OpenTelemetry trace
//! context, and the metadata carrier the transport ships across the wire.

use std::time::{Duration, SystemTime};

use crate::metadata::Metadata;

/// Requests are expected to complete within this window unless a caller says
/// otherwise.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// The context of one in-flight operation.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Context {
    /// When the operation should give up.
    pub deadline: SystemTime,
    /// The active trace context. Outbound wrappers replace this with the
    /// context of the span they start; the inbound wrapper replaces it with
    /// the remote parent extracted from [`Self::metadata`].
    pub trace: opentelemetry::Context,
    /// The metadata carrier attached to the request, if any. Created
    /// transparently by injection when absent.
    pub metadata: Option<Metadata>,
}

impl Context {
    /// Returns a context for the current scope: the ambient OpenTelemetry
    /// context, a default deadline, and no metadata carrier yet.
    pub fn current() -> Self {
        Self {
            deadline: SystemTime::now() + DEFAULT_DEADLINE,
            trace: opentelemetry::Context::current(),
            metadata: None,
        }
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: SystemTime) -> Self {
        self.deadline = deadline;
        self
    }

    /// Attaches a metadata carrier, replacing any existing one. Transports
    /// use this to hand an inbound request's metadata to the handler side.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The metadata carrier attached to this context, if any.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::current()
    }
}

/// Returns a [`Context`] for the current scope.
pub fn current() -> Context {
    Context::current()
}
