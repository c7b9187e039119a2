//! Tail a line-delimited JSON stream from stdin.
//!
//! Decoded records print as pretty JSON on stdout; interleaved plain
//! text passes through to stderr untouched.
//!
//! ```bash
//! printf 'starting up\n{"event":"ready","pid":4242}\n' | cargo run --example tail
//! ```

use linewire::{Endpoint, StreamEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (_endpoint, mut events) = Endpoint::builder().connect_stdio();

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Record(value) => {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            StreamEvent::Text(text) => eprint!("{}", text),
            StreamEvent::Error(e) => eprintln!("stream error: {}", e),
            StreamEvent::End => break,
        }
    }

    Ok(())
}
