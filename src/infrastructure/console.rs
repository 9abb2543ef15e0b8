use crate::application::analysis::summary::render_payload;
use crate::config::OutputFormat;
use crate::domain::dispatch::{DeliveryPayload, Destination};
use crate::domain::errors::DeliveryError;
use crate::domain::ports::DeliverySink;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Writes deliveries to stdout, one block per destination.
pub struct ConsoleSink {
    output_format: OutputFormat,
}

impl ConsoleSink {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }

    pub fn format(&self, destination: &Destination, payload: &DeliveryPayload) -> Result<String, DeliveryError> {
        match self.output_format {
            OutputFormat::Text => Ok(format!("[{}] {}\n", destination, render_payload(payload))),
            OutputFormat::Json => {
                let body = serde_json::to_string(payload).map_err(|e| DeliveryError::Rejected {
                    destination: destination.to_string(),
                    reason: format!("serialization failed: {}", e),
                })?;
                Ok(format!(
                    "{{\"destination\":\"{}\",\"payload\":{}}}\n",
                    destination, body
                ))
            }
        }
    }
}

#[async_trait]
impl DeliverySink for ConsoleSink {
    async fn deliver(
        &self,
        destination: &Destination,
        payload: &DeliveryPayload,
    ) -> Result<(), DeliveryError> {
        let text = self.format(destination, payload)?;
        let transport = |e: std::io::Error| DeliveryError::Transport {
            destination: destination.to_string(),
            reason: e.to_string(),
        };

        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await.map_err(transport)?;
        stdout.flush().await.map_err(transport)
    }
}
