//! Announce a few framed records on stdout and report the backpressure
//! signal for each write.
//!
//! ```bash
//! cargo run --example announce | cat
//! ```

use serde_json::json;

use linewire::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (endpoint, _events) = Endpoint::builder().connect_stdio();

    for seq in 0..5u32 {
        let flushed = endpoint.write(&json!({ "event": "tick", "seq": seq }))?;
        eprintln!("tick {} {}", seq, if flushed { "flushed" } else { "queued" });
    }

    // Wait until the last line has actually reached the pipe before
    // exiting, or the process may close stdout with lines still queued.
    let (_, notify) = endpoint.write_notified(&json!({ "event": "done" }))?;
    notify.await?;

    Ok(())
}
