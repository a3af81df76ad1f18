// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use clap::Parser;
use otelmesh::client::{Publisher, Stub, TracedPublisher, TracedStub};
use otelmesh::context;
use otelmesh::server::TracedServe;
use service::{init_tracing, GreetRequest, HelloServe, LogPublisher, Loopback, Notice};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Parser)]
struct Flags {
    /// Sets the name to greet.
    #[clap(long, default_value = "world")]
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();
    init_tracing("otelmesh-demo")?;

    // Traced on both ends of the loopback, the way a real deployment wraps
    // the client stub in one process and the handler in another.
    let client = TracedStub::new(Loopback::new(TracedServe::new(HelloServe)));

    match client.call(context::current(), GreetRequest { name: flags.name }).await {
        Ok(greeting) => tracing::info!("{greeting}"),
        Err(e) => tracing::warn!("{:?}", anyhow::Error::from(e)),
    }

    let publisher = TracedPublisher::new(LogPublisher);
    publisher.publish(context::current(), Notice { topic: "greetings.sent".to_string() }).await?;

    // Let the background span processor finish.
    sleep(Duration::from_micros(10)).await;
    opentelemetry::global::shutdown_tracer_provider();

    Ok(())
}
