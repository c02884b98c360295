//! Remote inference sink
//!
//! Sends recognized text plus a fixed system instruction to an
//! OpenAI-compatible chat-completions endpoint, asking for a JSON-shaped
//! actuation intent. The model's reply is forwarded verbatim through the
//! command translator to the actuator transport.
//!
//! Retry policy: up to `retry_count` attempts with exponential backoff
//! (2^attempt seconds between attempts). Transient failures (timeouts,
//! transport errors, HTTP 429) retry; HTTP 401 is fatal and aborts
//! immediately; other non-2xx responses are logged and retried on the same
//! schedule. The sink reports success as soon as the HTTP call itself
//! succeeds; a downstream forwarding failure is logged but does not flip the
//! result, because the remote call achieved its contract.

use super::{RecognitionEvent, Sink};
use crate::actuator::ActuatorTransport;
use crate::command;
use crate::config::RemoteInferenceConfig;
use crate::error::{SinkError, VoxwinError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Endpoint failure, split so the retry loop can classify it
pub(crate) enum EndpointError {
    /// Non-2xx HTTP status with whatever detail the body carried
    Status(u16, String),
    /// Timeout or transport-level failure
    Transport(String),
}

/// Seam over the HTTP call so the retry schedule is testable
pub(crate) trait ChatEndpoint: Send + Sync {
    fn complete(&self, payload: &Value) -> Result<Value, EndpointError>;
}

/// ureq-backed production endpoint
struct UreqEndpoint {
    agent: ureq::Agent,
    url: String,
    api_key: String,
}

impl ChatEndpoint for UreqEndpoint {
    fn complete(&self, payload: &Value) -> Result<Value, EndpointError> {
        let response = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(payload);

        match response {
            Ok(resp) => resp
                .into_json::<Value>()
                .map_err(|e| EndpointError::Transport(format!("response parse failed: {}", e))),
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp.into_string().unwrap_or_default();
                Err(EndpointError::Status(code, detail))
            }
            Err(ureq::Error::Transport(t)) => Err(EndpointError::Transport(t.to_string())),
        }
    }
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Backoff before the next attempt: 1s, 2s, 4s, ...
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt)
}

/// Sink that interprets recognized text through a remote language model
pub struct RemoteInferenceHandler {
    endpoint: Box<dyn ChatEndpoint>,
    model: String,
    system_prompt: String,
    retry_count: u32,
    sleeper: Sleeper,
    actuator: Option<Arc<Mutex<ActuatorTransport>>>,
}

impl RemoteInferenceHandler {
    /// Build the production handler. The API key comes from the config or
    /// the `VOXWIN_API_KEY` environment variable.
    pub fn new(
        config: &RemoteInferenceConfig,
        actuator: Option<Arc<Mutex<ActuatorTransport>>>,
    ) -> Result<Self, VoxwinError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("VOXWIN_API_KEY").ok())
            .ok_or_else(|| {
                VoxwinError::Config(
                    "remote inference is enabled but no API key is configured \
                     (set [remote_inference].api_key or VOXWIN_API_KEY)"
                        .to_string(),
                )
            })?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        tracing::info!(
            "Remote inference configured: model={}, timeout={}s, retries={}",
            config.model,
            config.timeout_secs,
            config.retry_count
        );

        Ok(Self {
            endpoint: Box::new(UreqEndpoint {
                agent,
                url: config.endpoint.clone(),
                api_key,
            }),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            retry_count: config.retry_count.max(1),
            sleeper: Box::new(std::thread::sleep),
            actuator,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(
        endpoint: Box<dyn ChatEndpoint>,
        retry_count: u32,
        sleeper: Sleeper,
        actuator: Option<Arc<Mutex<ActuatorTransport>>>,
    ) -> Self {
        Self {
            endpoint,
            model: "test-model".to_string(),
            system_prompt: "test prompt".to_string(),
            retry_count,
            sleeper,
            actuator,
        }
    }

    fn build_payload(&self, text: &str, event: &RecognitionEvent) -> Value {
        let system = format!(
            "{}\n\nContext:\n- time: {}\n- result type: {}",
            self.system_prompt,
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.kind.as_str()
        );
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": text },
            ],
        })
    }

    /// Push the model's reply through translator and transport. Failures are
    /// logged only; the HTTP contract was already fulfilled.
    fn forward(&self, content: &str) {
        let cmd = command::translate(content);
        if !cmd.is_actionable() {
            tracing::info!("Model reply produced no actionable command, skipping actuator");
            return;
        }
        match &self.actuator {
            Some(actuator) => {
                let wire = cmd.wire();
                let sent = match actuator.lock() {
                    Ok(mut transport) => transport.send(&wire),
                    Err(poisoned) => poisoned.into_inner().send(&wire),
                };
                if sent {
                    tracing::info!("Actuator command forwarded: '{}'", wire);
                } else {
                    tracing::warn!("Actuator forwarding failed for '{}'", wire);
                }
            }
            None => tracing::debug!("No actuator attached, command '{}' dropped", cmd.wire()),
        }
    }
}

impl Sink for RemoteInferenceHandler {
    fn name(&self) -> &'static str {
        "remote-inference"
    }

    fn send(&self, text: &str, event: &RecognitionEvent) -> Result<(), SinkError> {
        let payload = self.build_payload(text, event);

        for attempt in 0..self.retry_count {
            match self.endpoint.complete(&payload) {
                Ok(body) => {
                    if let Some(tokens) = body["usage"]["total_tokens"].as_u64() {
                        tracing::debug!("Remote inference used {} tokens", tokens);
                    }
                    match body["choices"][0]["message"]["content"].as_str() {
                        Some(content) => {
                            tracing::info!("Remote inference reply: {:?}", content);
                            self.forward(content);
                            return Ok(());
                        }
                        None => {
                            tracing::warn!(
                                "Malformed completion response (attempt {}/{})",
                                attempt + 1,
                                self.retry_count
                            );
                        }
                    }
                }
                Err(EndpointError::Status(401, _)) => {
                    tracing::error!("Remote inference authentication failed, not retrying");
                    return Err(SinkError::Auth);
                }
                Err(EndpointError::Status(429, _)) => {
                    tracing::warn!(
                        "Remote inference rate limited (attempt {}/{})",
                        attempt + 1,
                        self.retry_count
                    );
                }
                Err(EndpointError::Status(code, detail)) => {
                    tracing::warn!(
                        "Remote inference HTTP {} (attempt {}/{}): {}",
                        code,
                        attempt + 1,
                        self.retry_count,
                        detail
                    );
                }
                Err(EndpointError::Transport(msg)) => {
                    tracing::warn!(
                        "Remote inference request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.retry_count,
                        msg
                    );
                }
            }

            if attempt + 1 < self.retry_count {
                (self.sleeper)(retry_delay(attempt));
            }
        }

        tracing::warn!("Remote inference gave up after {} attempts", self.retry_count);
        Err(SinkError::Exhausted {
            attempts: self.retry_count,
        })
    }
}
