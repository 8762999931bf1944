use serde::Deserialize;
use serde_json::Value;
use starter_core::MemoryPublisher;
use starter_model::channel;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// One line of input: a message for the start or the stop channel.
///
/// A string `payload` is sent verbatim, anything else as encoded JSON.
#[derive(Debug, Deserialize)]
struct Envelope {
    channel: String,
    #[serde(default)]
    routing_key: String,
    payload: Value,
}

impl Envelope {
    fn body(self) -> anyhow::Result<(String, Vec<u8>)> {
        let body = match self.payload {
            Value::String(raw) => raw.into_bytes(),
            other => serde_json::to_vec(&other)?,
        };
        Ok((self.routing_key, body))
    }
}

/// Forward newline-delimited envelopes until EOF. Returns the number forwarded.
///
/// Unreadable lines are logged and skipped.
pub async fn pump<R>(
    reader: R,
    start: MemoryPublisher,
    stop: MemoryPublisher,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope: Envelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "skipping unreadable input line");
                continue;
            }
        };

        let publisher = match envelope.channel.as_str() {
            channel::START => &start,
            channel::STOP => &stop,
            other => {
                warn!(channel = other, "skipping envelope for unknown channel");
                continue;
            }
        };
        let (routing_key, body) = envelope.body()?;
        let tag = publisher.publish(routing_key, body).await?;
        debug!(tag, "envelope forwarded");
        forwarded += 1;
    }

    info!(forwarded, "input closed");
    Ok(forwarded)
}
