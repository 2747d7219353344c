use super::{FlightDataProvider, FlightVar, ProviderError, SimEvent, VarMap};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Scripted provider for control-law and scheduler tests: serves canned
/// variable values and records every write and event.
#[derive(Default)]
pub(crate) struct MockProvider {
    connected: AtomicBool,
    gets: AtomicUsize,
    vars: Mutex<HashMap<FlightVar, f64>>,
    sets: Mutex<Vec<(FlightVar, f64)>>,
    triggers: Mutex<Vec<(SimEvent, Option<f64>)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.connected.store(true, Ordering::Relaxed);
        mock
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn stage(&self, var: FlightVar, value: f64) {
        self.vars.lock().unwrap().insert(var, value);
    }

    /// All recorded writes, oldest first.
    pub fn sets(&self) -> Vec<(FlightVar, f64)> { self.sets.lock().unwrap().clone() }

    /// The most recent write to `var`, if any.
    pub fn last_set(&self, var: FlightVar) -> Option<f64> {
        self.sets.lock().unwrap().iter().rev().find(|(v, _)| *v == var).map(|(_, value)| *value)
    }

    pub fn triggers(&self) -> Vec<(SimEvent, Option<f64>)> {
        self.triggers.lock().unwrap().clone()
    }

    /// Number of sample batches served so far.
    pub fn get_count(&self) -> usize { self.gets.load(Ordering::Relaxed) }

    pub fn clear_recordings(&self) {
        self.sets.lock().unwrap().clear();
        self.triggers.lock().unwrap().clear();
    }
}

#[async_trait]
impl FlightDataProvider for MockProvider {
    fn connected(&self) -> bool { self.connected.load(Ordering::Relaxed) }

    async fn get(&self, vars: &[FlightVar]) -> Result<VarMap, ProviderError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        if !self.connected() {
            return Err(ProviderError::NoConnection);
        }
        let staged = self.vars.lock().unwrap();
        Ok(vars.iter().filter_map(|v| staged.get(v).map(|value| (*v, *value))).collect())
    }

    async fn set(&self, var: FlightVar, value: f64) -> Result<(), ProviderError> {
        if !self.connected() {
            return Err(ProviderError::NoConnection);
        }
        self.sets.lock().unwrap().push((var, value));
        // Writes are visible to subsequent samples, like the live gateway.
        self.vars.lock().unwrap().insert(var, value);
        Ok(())
    }

    async fn trigger(&self, event: SimEvent, value: Option<f64>) -> Result<(), ProviderError> {
        if !self.connected() {
            return Err(ProviderError::NoConnection);
        }
        self.triggers.lock().unwrap().push((event, value));
        Ok(())
    }
}
