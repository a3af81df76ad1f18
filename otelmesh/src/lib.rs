// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! otelmesh instruments RPC microservice clients and servers with
//! OpenTelemetry distributed tracing.
//!
//! Outbound calls, stream opens, and publishes are wrapped in spans whose
//! trace context is injected into the request's metadata carrier; inbound
//! dispatch extracts the remote parent from that carrier and handles the
//! request under a child span. The RPC framework itself, the tracing
//! backend, and the carrier's transport are collaborators plugged in at the
//! trait seams — this crate only owns the boundary between tracing and
//! transport.
//!
//! Tracing never gets in the way of the traffic it observes: wrapped
//! operations' results pass through unmodified, and propagation problems
//! degrade to missing trace data rather than failed requests.
#![deny(missing_docs)]
#![allow(async_fn_in_trait)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod context;
pub mod metadata;
pub mod propagation;
pub mod request;
pub mod server;
pub mod telemetry;

pub use crate::context::Context;
pub use crate::metadata::Metadata;
pub use crate::request::{Message, Request};
pub use crate::telemetry::Telemetry;
