// Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use fanout_chat_lib::config::GenerationConfig;
use fanout_chat_lib::council::Council;
use fanout_chat_lib::events::EventBroadcaster;
use fanout_chat_lib::gateway::{BackendGateway, GatewayError, GenerateRequest};
use fanout_chat_lib::{ChatRequest, ChatTurn, Job, ModelRef, ModelSize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted model does when called
#[derive(Clone)]
pub enum Script {
    Reply(&'static str),
    Fail(&'static str),
    Delay(u64, Box<Script>),
}

/// Gateway with per-model scripts. The n-th call to a model uses the n-th
/// script, repeating the last one once they run out.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: HashMap<String, Vec<Script>>,
    counters: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<(String, Vec<ChatTurn>)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, model: &ModelRef, scripts: Vec<Script>) -> Self {
        self.scripts.insert(model.key(), scripts);
        self
    }

    /// Every call made so far as (model key, conversation sent)
    pub fn calls(&self) -> Vec<(String, Vec<ChatTurn>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, model: &ModelRef) -> Vec<Vec<ChatTurn>> {
        self.calls()
            .into_iter()
            .filter(|(key, _)| *key == model.key())
            .map(|(_, turns)| turns)
            .collect()
    }
}

#[async_trait]
impl BackendGateway for ScriptedGateway {
    async fn list_models(&self, _size: Option<ModelSize>) -> Result<Vec<ModelRef>, GatewayError> {
        let mut models: Vec<ModelRef> = self
            .scripts
            .keys()
            .filter_map(|key| key.split_once('/'))
            .map(|(provider, model)| ModelRef::new(provider, model))
            .collect();
        models.sort_by_key(|m| m.key());
        Ok(models)
    }

    async fn generate_text(&self, request: GenerateRequest<'_>) -> Result<String, GatewayError> {
        let key = request.target.key();
        self.calls
            .lock()
            .unwrap()
            .push((key.clone(), request.history.to_vec()));

        let index = {
            let mut counters = self.counters.lock().unwrap();
            let counter = counters.entry(key.clone()).or_insert(0);
            let index = *counter;
            *counter += 1;
            index
        };

        let mut script = match self.scripts.get(&key) {
            Some(scripts) if !scripts.is_empty() => scripts[index.min(scripts.len() - 1)].clone(),
            _ => Script::Fail("unscripted model"),
        };

        loop {
            match script {
                Script::Reply(text) => return Ok(text.to_string()),
                Script::Fail(message) => {
                    return Err(GatewayError::Request {
                        provider: request.target.provider.clone(),
                        message: message.to_string(),
                    })
                }
                Script::Delay(ms, inner) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    script = *inner;
                }
            }
        }
    }
}

pub fn model(provider: &str, name: &str) -> ModelRef {
    ModelRef::new(provider, name)
}

pub fn chat(message: &str, models: &[&ModelRef], combiner: &ModelRef) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        selected_models: models.iter().map(|m| (*m).clone()).collect(),
        combiner_model: Some(combiner.clone()),
    }
}

pub fn council_with(gateway: Arc<ScriptedGateway>) -> Council {
    Council::new(
        gateway,
        GenerationConfig::default(),
        Arc::new(EventBroadcaster::new()),
    )
}

/// Poll a job until it reaches a terminal status
pub async fn wait_for_job(council: &Council, job_id: &str) -> Job {
    for _ in 0..1000 {
        let job = council.get_job(job_id).expect("job should exist");
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} did not finish in time", job_id);
}
