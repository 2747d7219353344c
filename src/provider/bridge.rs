use super::{FlightDataProvider, FlightVar, ProviderError, SimEvent, VarMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Serialize)]
struct VarsRequest {
    names: Vec<String>,
}

#[derive(Deserialize)]
struct VarsResponse {
    /// Values aligned with the requested names; `null` for unknown vars.
    values: Vec<Option<f64>>,
}

#[derive(Serialize)]
struct SetRequest {
    name: String,
    value: f64,
}

#[derive(Serialize)]
struct EventRequest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
}

/// Default [`FlightDataProvider`] implementation: JSON over HTTP against
/// the host-controlled simulator gateway.
///
/// The client carries a preconfigured base URL and a timeout well below
/// the control-cycle period, so a hung gateway costs at most a few cycles.
/// The connection flag tracks the outcome of the most recent exchange.
#[derive(Debug)]
pub struct BridgeProvider {
    client: reqwest::Client,
    base_url: String,
    connected: AtomicBool,
}

impl BridgeProvider {
    /// Constructs a provider for the given gateway root, e.g.
    /// `"http://localhost:9330"`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(2))
                .build()
                .unwrap(),
            base_url: String::from(base_url),
            connected: AtomicBool::new(false),
        }
    }

    fn note_outcome<T>(&self, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
        match &result {
            Ok(_) => self.connected.store(true, Ordering::Relaxed),
            Err(ProviderError::NoConnection) => self.connected.store(false, Ordering::Relaxed),
            Err(_) => {}
        }
        result
    }

    async fn post<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}{endpoint}", self.base_url);
        let response = self.client.post(url).json(body).send().await?;
        if response.status().is_server_error() {
            return Err(ProviderError::InternalServer);
        }
        if response.status().is_client_error() {
            return Err(ProviderError::BadRequest);
        }
        Ok(response)
    }
}

#[async_trait]
impl FlightDataProvider for BridgeProvider {
    fn connected(&self) -> bool { self.connected.load(Ordering::Relaxed) }

    async fn get(&self, vars: &[FlightVar]) -> Result<VarMap, ProviderError> {
        let body = VarsRequest { names: vars.iter().map(ToString::to_string).collect() };
        let result = async {
            let response = self.post("/vars/get", &body).await?;
            let parsed = response.json::<VarsResponse>().await?;
            Ok(vars
                .iter()
                .zip(parsed.values)
                .filter_map(|(var, value)| value.map(|v| (*var, v)))
                .collect())
        }
        .await;
        self.note_outcome(result)
    }

    async fn set(&self, var: FlightVar, value: f64) -> Result<(), ProviderError> {
        let body = SetRequest { name: var.to_string(), value };
        let result = self.post("/vars/set", &body).await.map(|_| ());
        self.note_outcome(result)
    }

    async fn trigger(&self, event: SimEvent, value: Option<f64>) -> Result<(), ProviderError> {
        let body = EventRequest { name: event.to_string(), value };
        let result = self.post("/events", &body).await.map(|_| ());
        self.note_outcome(result)
    }
}
