// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! Trace context propagation across process boundaries.
//!
//! [`MetadataInjector`] and [`MetadataExtractor`] adapt a [`Metadata`] carrier
//! to the interfaces the OpenTelemetry propagation format expects. [`inject`]
//! and [`extract`] are the context-level operations the wrappers run before
//! every outbound send and inbound dispatch, using the process-global
//! propagation format; [`crate::telemetry::Telemetry`] offers the same
//! operations with an explicitly configured format.

use opentelemetry::global;
use opentelemetry::propagation::{Extractor, Injector};

use crate::context::Context;
use crate::metadata::Metadata;

/// Writes propagation keys into a [`Metadata`] carrier.
pub struct MetadataInjector<'a>(pub &'a mut Metadata);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.0.set(key, value);
    }
}

/// Reads propagation keys out of a [`Metadata`] carrier.
pub struct MetadataExtractor<'a>(pub &'a Metadata);

impl Extractor for MetadataExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)
    }

    // The W3C trace context format reads its fixed header names and never
    // enumerates the carrier, so enumeration is deliberately unsupported.
    fn keys(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Serializes `ctx.trace` into the context's metadata carrier using the
/// globally registered propagation format.
///
/// A carrier is created transparently when the context has none. Injection
/// overwrites the propagation keys in place, so repeating it with the same
/// trace context is idempotent, and it never fails: the format absorbs its
/// own errors.
pub fn inject(mut ctx: Context) -> Context {
    let trace = ctx.trace.clone();
    let metadata = ctx.metadata.get_or_insert_with(Metadata::new);
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&trace, &mut MetadataInjector(metadata));
    });
    ctx
}

/// Replaces `ctx.trace` with the remote trace context parsed from the
/// context's metadata carrier using the globally registered propagation
/// format.
///
/// Extraction never fails the request: a missing carrier is reported as a
/// debug diagnostic and treated as empty, and missing or malformed keys
/// degrade to "no remote parent" per the format's own leniency contract.
pub fn extract(mut ctx: Context) -> Context {
    let empty;
    let metadata = match ctx.metadata.as_ref() {
        Some(metadata) => metadata,
        None => {
            tracing::debug!("[OTELMESH] no metadata carrier attached to the inbound context");
            empty = Metadata::new();
            &empty
        },
    };
    ctx.trace = global::get_text_map_propagator(|propagator| {
        propagator.extract_with_context(&ctx.trace, &MetadataExtractor(metadata))
    });
    ctx
}
