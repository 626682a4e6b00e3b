//! Deterministic generator for tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{GenerationError, TextGenerator};

enum Behaviour {
    Reply(String),
    Fail,
    Stall(Duration),
}

pub struct FakeGenerator {
    behaviour: Behaviour,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    fn with(behaviour: Behaviour) -> Self {
        Self { behaviour, prompts: Mutex::new(Vec::new()) }
    }

    pub fn replying(text: &str) -> Self {
        Self::with(Behaviour::Reply(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::with(Behaviour::Fail)
    }

    /// Sleeps before answering, for exercising timeouts.
    pub fn stalling(delay: Duration) -> Self {
        Self::with(Behaviour::Stall(delay))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        match &self.behaviour {
            Behaviour::Reply(text) => Ok(text.clone()),
            Behaviour::Fail => Err(GenerationError::Api {
                status: 503,
                message: "unavailable".into(),
            }),
            Behaviour::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("{}".to_string())
            }
        }
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}
