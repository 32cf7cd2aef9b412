use crate::core::{Object, ResolveError, Result};
use crate::network::{CallOptions, CallResult, NetworkClient};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One call received by [`MockNetwork`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Model identifier or metadata URL
    pub model: String,
    /// Operation name
    pub operation: String,
    /// Options as received
    pub options: CallOptions,
}

type Key = (String, String, Option<u64>);

#[derive(Debug, Default)]
struct State {
    responses: BTreeMap<Key, Result<CallResult>>,
    delays: BTreeMap<(String, String), Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// Answers backend calls with canned results.
///
/// Responses are keyed by model and operation, optionally per page. Unknown
/// calls fail with a network error. Clones share the recorded calls.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    state: Arc<State>,
}

fn to_objects(values: Vec<Value>) -> Vec<Object> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .collect()
}

impl MockNetwork {
    /// A network without responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut State {
        // Builders run before the network is shared.
        Arc::get_mut(&mut self.state).unwrap_or_else(|| panic!("MockNetwork configured after being cloned"))
    }

    fn key(model: &str, operation: &str, page: Option<u64>) -> Key {
        (model.to_string(), operation.to_string(), page)
    }

    /// Answer `model.operation` with `objects`.
    #[must_use]
    pub fn respond(self, model: &str, operation: &str, objects: Vec<Value>) -> Self {
        self.respond_result(model, operation, CallResult::from_objects(to_objects(objects)))
    }

    /// Answer `model.operation` with a full result.
    #[must_use]
    pub fn respond_result(mut self, model: &str, operation: &str, result: CallResult) -> Self {
        self.state_mut().responses.insert(Self::key(model, operation, None), Ok(result));
        self
    }

    /// Answer `page` of `model.operation`. A call without `page` param asks for page 1.
    #[must_use]
    pub fn respond_page(mut self, model: &str, operation: &str, page: u64, result: CallResult) -> Self {
        self.state_mut().responses.insert(Self::key(model, operation, Some(page)), Ok(result));
        self
    }

    /// Fail `model.operation` with `error`.
    #[must_use]
    pub fn fail(mut self, model: &str, operation: &str, error: ResolveError) -> Self {
        self.state_mut().responses.insert(Self::key(model, operation, None), Err(error));
        self
    }

    /// Delay answers to `model.operation`.
    #[must_use]
    pub fn delay(mut self, model: &str, operation: &str, delay: Duration) -> Self {
        self.state_mut().delays.insert((model.to_string(), operation.to_string()), delay);
        self
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of calls received for `model.operation`.
    #[must_use]
    pub fn call_count(&self, model: &str, operation: &str) -> usize {
        self.calls().iter().filter(|call| call.model == model && call.operation == operation).count()
    }
}

#[async_trait]
impl NetworkClient for MockNetwork {
    async fn invoke(&self, model: &str, operation: &str, options: CallOptions) -> Result<CallResult> {
        let page = options.params.get("page").and_then(Value::as_u64).unwrap_or(1);
        self.state.calls.lock().unwrap_or_else(PoisonError::into_inner).push(RecordedCall {
            model: model.to_string(),
            operation: operation.to_string(),
            options,
        });

        if let Some(delay) = self.state.delays.get(&(model.to_string(), operation.to_string())) {
            tokio::time::sleep(*delay).await;
        }

        self.state
            .responses
            .get(&Self::key(model, operation, Some(page)))
            .or_else(|| self.state.responses.get(&Self::key(model, operation, None)))
            .cloned()
            .unwrap_or_else(|| Err(ResolveError::network(format!("no response for {model}.{operation}"))))
    }
}
