//! Simulation config document (JSON) and scenario construction.

use std::path::Path;

use rand::Rng;
use rand::distributions::Standard;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{DEFAULT_PRIORITY, Priority, Request, RequestId, WorkerId, WorkerState};

/// Top-level config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub requests: Vec<RequestConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub id: WorkerId,
    /// Non-positive values are clamped to 1 when the scenario is built.
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    pub id: RequestId,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default = "default_cost")]
    pub estimated_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<f64>,
}

fn default_category() -> String {
    "generic".to_string()
}

fn default_priority() -> Priority {
    DEFAULT_PRIORITY
}

fn default_cost() -> f64 {
    1.0
}

/// A validated, sanitized run input: workers sorted by id, requests
/// sorted by `(arrival, id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub workers: Vec<WorkerState>,
    pub requests: Vec<Request>,
}

impl SimConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Built-in scenario used when no config file is given.
    pub fn default_scenario() -> Self {
        let server = |id, capacity| ServerConfig { id, capacity };
        let request = |id, category: &str, priority, estimated_cost| RequestConfig {
            id,
            category: category.to_string(),
            priority,
            estimated_cost,
            arrival_time: None,
        };

        SimConfig {
            servers: vec![server(1, 3), server(2, 2), server(3, 1)],
            requests: vec![
                request(101, "vision", 1, 8.0),
                request(102, "nlp", 3, 3.0),
                request(103, "speech", 2, 5.0),
            ],
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        if self.requests.is_empty() {
            return Err(ConfigError::NoRequests);
        }
        Ok(())
    }

    /// Validate, sanitize and resolve arrival times.
    ///
    /// When every request omits `arrival_time`, arrivals are spread out by
    /// accumulating `uniform[0, 1) * jitter` in id order. When only some
    /// omit it, each missing value is an independent draw in `[0, jitter)`.
    pub fn build<R: Rng>(&self, rng: &mut R, jitter: f64) -> ConfigResult<Scenario> {
        self.validate()?;
        let jitter = jitter.max(0.0);

        let mut workers: Vec<WorkerState> = self
            .servers
            .iter()
            .map(|s| WorkerState::new(s.id, s.capacity.clamp(1, i64::from(u32::MAX)) as u32))
            .collect();
        workers.sort_by_key(|w| w.id);

        let mut requests: Vec<Request> = self
            .requests
            .iter()
            .map(|r| {
                let arrival = match r.arrival_time {
                    Some(t) => t,
                    None => draw(rng) * jitter,
                };
                Request::new(r.id, r.category.clone(), r.priority, r.estimated_cost, arrival)
            })
            .collect();

        if self.requests.iter().all(|r| r.arrival_time.is_none()) {
            requests.sort_by_key(|r| r.id);
            let mut t = 0.0;
            for req in &mut requests {
                t += draw(rng) * jitter;
                req.arrival = t;
            }
        }

        requests.sort_by(|a, b| a.arrival.total_cmp(&b.arrival).then(a.id.cmp(&b.id)));

        Ok(Scenario { workers, requests })
    }
}

fn draw<R: Rng>(rng: &mut R) -> f64 {
    rng.sample::<f64, _>(Standard)
}
