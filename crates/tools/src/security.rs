//! Behaviour analytics for the agents calling the tools.
//!
//! Keeps a running-average baseline of numeric metrics per agent, scores
//! deviations from it, and records security events. High and critical events
//! raise alerts that show up in the agent's security report.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use fleetcare_common::clock::{Clock, SystemClock};
use fleetcare_common::traits::parse_args;
use fleetcare_common::{FleetError, Result, Tool};
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACTIONS: &[&str] = &[
    "establish_baseline",
    "detect_anomaly",
    "log_event",
    "get_threat_score",
    "analyze_behavior",
    "get_security_report",
];

const DEFAULT_METRICS: [&str; 6] = [
    "activity_frequency",
    "resource_access_pattern",
    "communication_frequency",
    "execution_time_variance",
    "error_rate",
    "permission_escalations",
];

/// Events above this anomaly score are logged automatically.
const AUTO_LOG_SCORE: f64 = 0.8;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SecurityInput {
    /// Identifier of the monitored agent
    pub agent_id: String,
    /// Metrics or event fields, depending on the action
    #[serde(default)]
    pub event_data: Option<Map<String, Value>>,
    /// Analysis window in hours
    #[serde(default = "default_time_window")]
    pub time_window: i64,
    /// Relative deviation that counts as an anomaly
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_time_window() -> i64 {
    24
}

fn default_threshold() -> f64 {
    0.7
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Band for an agent's accumulated threat score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Critical
        } else if score >= 0.6 {
            Self::High
        } else if score >= 0.3 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Band for a single metric's relative deviation.
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation > 2.0 {
            Self::Critical
        } else if deviation > 1.5 {
            Self::High
        } else if deviation > 1.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Level of a logged event, from keywords in its type or its score.
    pub fn for_event(event: &Map<String, Value>) -> Self {
        let event_type = event
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let score = event.get("threat_score").and_then(Value::as_f64).unwrap_or(0.0);

        if event_type.contains("critical") || score > 0.9 {
            Self::Critical
        } else if event_type.contains("high") || score > 0.7 {
            Self::High
        } else if event_type.contains("medium") || score > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub created_at: String,
    pub last_updated: String,
    pub metrics: BTreeMap<String, f64>,
    pub sample_count: u64,
    pub behavior_profile: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub metric: String,
    pub baseline_value: f64,
    pub current_value: f64,
    pub deviation: f64,
    pub severity: ThreatLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub agent_id: String,
    pub timestamp: String,
    pub event_data: Map<String, Value>,
    pub threat_level: ThreatLevel,
    pub requires_attention: bool,
    #[serde(skip)]
    at: NaiveDateTime,
}

impl SecurityEvent {
    fn event_type(&self) -> &str {
        self.event_data
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub alert_id: String,
    pub agent_id: String,
    pub timestamp: String,
    pub threat_level: ThreatLevel,
    pub description: String,
    pub status: &'static str,
}

#[derive(Debug, Default)]
struct MonitorState {
    baselines: HashMap<String, Baseline>,
    threat_scores: HashMap<String, f64>,
    events: Vec<SecurityEvent>,
    alerts: Vec<Alert>,
    last_analysis: HashMap<String, NaiveDateTime>,
}

impl MonitorState {
    fn threat_score(&self, agent_id: &str) -> f64 {
        self.threat_scores.get(agent_id).copied().unwrap_or(0.0)
    }

    fn events_since<'a>(&'a self, agent_id: &'a str, cutoff: NaiveDateTime) -> impl Iterator<Item = &'a SecurityEvent> {
        self.events
            .iter()
            .filter(move |e| e.agent_id == agent_id && e.at > cutoff)
    }

    /// Record an event, raising an alert for high and critical ones.
    fn log(&mut self, agent_id: &str, event_data: Map<String, Value>, now: NaiveDateTime) -> &SecurityEvent {
        let threat_level = ThreatLevel::for_event(&event_data);
        let requires_attention = threat_level >= ThreatLevel::High;
        let timestamp = format_timestamp(now);

        if requires_attention {
            let alert = Alert {
                alert_id: format!("alert_{}", self.alerts.len() + 1),
                agent_id: agent_id.to_string(),
                timestamp: timestamp.clone(),
                threat_level,
                description: event_data
                    .get("event_type")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown security event")
                    .to_string(),
                status: "active",
            };
            warn!(agent_id, alert_id = %alert.alert_id, level = threat_level.as_str(), "Security alert raised");
            self.alerts.push(alert);
        }

        self.events.push(SecurityEvent {
            agent_id: agent_id.to_string(),
            timestamp,
            event_data,
            threat_level,
            requires_attention,
            at: now,
        });
        self.last_analysis.insert(agent_id.to_string(), now);
        &self.events[self.events.len() - 1]
    }
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// UEBA security monitor tool.
pub struct SecurityMonitor {
    clock: Arc<dyn Clock>,
    state: Mutex<MonitorState>,
}

impl Default for SecurityMonitor {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SecurityMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Fold a sample into the agent's baseline and reset its threat score.
    pub fn establish_baseline(&self, agent_id: &str, sample: Map<String, Value>) -> Baseline {
        let now = format_timestamp(self.clock.now());
        let mut state = self.state.lock();
        let baseline = state
            .baselines
            .entry(agent_id.to_string())
            .or_insert_with(|| Baseline {
                created_at: now.clone(),
                last_updated: now.clone(),
                metrics: DEFAULT_METRICS.iter().map(|m| (m.to_string(), 0.0)).collect(),
                sample_count: 0,
                behavior_profile: Map::new(),
            });

        let n = baseline.sample_count as f64;
        for (metric, value) in sample {
            match value.as_f64() {
                Some(v) => {
                    let avg = baseline.metrics.entry(metric).or_insert(0.0);
                    *avg = (*avg * n + v) / (n + 1.0);
                }
                None => {
                    baseline.behavior_profile.insert(metric, value);
                }
            }
        }
        baseline.sample_count += 1;
        baseline.last_updated = now;
        let snapshot = baseline.clone();

        state.threat_scores.insert(agent_id.to_string(), 0.0);
        info!(agent_id, samples = snapshot.sample_count, "Baseline updated");
        snapshot
    }

    /// Compare a sample with the baseline. Returns the anomalies and the
    /// agent's resulting threat score.
    pub fn detect_anomaly(&self, agent_id: &str, sample: &Map<String, Value>, threshold: f64) -> Result<(Vec<Anomaly>, f64)> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let baseline = state.baselines.get(agent_id).ok_or_else(|| {
            FleetError::not_found(format!(
                "No baseline established for agent {}. Please establish baseline first.",
                agent_id
            ))
        })?;

        let anomalies: Vec<Anomaly> = sample
            .iter()
            .filter_map(|(metric, value)| {
                let current = value.as_f64()?;
                let base = *baseline.metrics.get(metric)?;
                if base <= 0.0 {
                    return None;
                }
                let deviation = (current - base).abs() / base;
                (deviation > threshold).then(|| Anomaly {
                    metric: metric.clone(),
                    baseline_value: base,
                    current_value: current,
                    deviation,
                    severity: ThreatLevel::from_deviation(deviation),
                })
            })
            .collect();

        if !anomalies.is_empty() {
            let mean = anomalies.iter().map(|a| a.deviation).sum::<f64>() / anomalies.len() as f64;
            let score = mean.min(1.0);
            let previous = state.threat_score(agent_id);
            state.threat_scores.insert(agent_id.to_string(), previous.max(score));

            if score > AUTO_LOG_SCORE {
                let mut event = Map::new();
                event.insert("event_type".into(), json!("high_anomaly_detected"));
                event.insert("threat_score".into(), json!(score));
                event.insert("anomalies".into(), serde_json::to_value(&anomalies)?);
                state.log(agent_id, event, now);
            }
        }

        debug!(agent_id, anomalies = anomalies.len(), "Anomaly check complete");
        Ok((anomalies, state.threat_score(agent_id)))
    }

    fn log_event(&self, agent_id: &str, event_data: Map<String, Value>) -> Value {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let (level, attention) = {
            let event = state.log(agent_id, event_data, now);
            (event.threat_level, event.requires_attention)
        };
        json!({
            "status": "success",
            "message": "Security event logged",
            "event_id": state.events.len(),
            "threat_level": level,
            "requires_attention": attention,
        })
    }

    fn threat_score_report(&self, agent_id: &str) -> Value {
        let now = self.clock.now();
        let state = self.state.lock();
        let score = state.threat_score(agent_id);
        json!({
            "status": "success",
            "agent_id": agent_id,
            "threat_score": score,
            "risk_level": ThreatLevel::from_score(score),
            "recent_events_count": state.events_since(agent_id, now - Duration::hours(24)).count(),
            "last_analysis": state
                .last_analysis
                .get(agent_id)
                .map(|t| format_timestamp(*t))
                .unwrap_or_else(|| "Never".to_string()),
        })
    }

    fn analyze_behavior(&self, agent_id: &str, hours: i64) -> Result<Value> {
        let now = self.clock.now();
        let since = window_start(now, hours)?;
        let state = self.state.lock();
        let mut threat_levels: BTreeMap<&str, usize> = BTreeMap::new();
        let mut event_types: BTreeMap<&str, usize> = BTreeMap::new();
        let mut total = 0;
        for event in state.events_since(agent_id, since) {
            total += 1;
            *threat_levels.entry(event.threat_level.as_str()).or_default() += 1;
            *event_types.entry(event.event_type()).or_default() += 1;
        }

        let mut recommendations = Vec::new();
        if threat_levels.get("high").copied().unwrap_or(0) > 0 {
            recommendations.push("High threat events detected - review agent permissions and activities");
        }
        if total > 50 {
            recommendations.push("High activity volume - consider adjusting monitoring sensitivity");
        }
        if recommendations.is_empty() {
            recommendations.push("Behavior appears normal within acceptable parameters");
        }

        Ok(json!({
            "status": "success",
            "analysis": {
                "agent_id": agent_id,
                "time_window_hours": hours,
                "total_events": total,
                "threat_levels": threat_levels,
                "common_event_types": event_types,
                "behavior_trends": {},
                "recommendations": recommendations,
            },
            "analysis_timestamp": format_timestamp(now),
        }))
    }

    fn security_report(&self, agent_id: &str, hours: i64) -> Result<Value> {
        let now = self.clock.now();
        let since = window_start(now, hours)?;
        let state = self.state.lock();
        let score = state.threat_score(agent_id);
        let recent: Vec<&SecurityEvent> = state.events_since(agent_id, since).collect();
        let alerts: Vec<&Alert> = state
            .alerts
            .iter()
            .filter(|a| a.agent_id == agent_id && a.status == "active")
            .collect();
        let count = |level: ThreatLevel| recent.iter().filter(|e| e.threat_level == level).count();

        let mut recommendations = Vec::new();
        if score > 0.7 {
            recommendations.push("Consider implementing additional access controls for this agent");
            recommendations.push("Review and audit recent agent activities");
        }
        if count(ThreatLevel::High) > 3 {
            recommendations.push("Multiple high-risk events detected - investigate potential security breach");
        }
        if recent.len() > 100 {
            recommendations.push("Unusually high activity volume - review for potential automation or misuse");
        }
        if recommendations.is_empty() {
            recommendations.push("Security posture appears normal - continue regular monitoring");
        }

        Ok(json!({
            "status": "success",
            "security_report": {
                "agent_id": agent_id,
                "report_generated": format_timestamp(now),
                "time_window_hours": hours,
                "summary": {
                    "current_threat_score": score,
                    "risk_level": ThreatLevel::from_score(score),
                    "total_events": recent.len(),
                    "active_alerts": alerts.len(),
                    "baseline_established": state.baselines.contains_key(agent_id),
                },
                "threat_analysis": {
                    "high_risk_events": count(ThreatLevel::High),
                    "medium_risk_events": count(ThreatLevel::Medium),
                    "low_risk_events": count(ThreatLevel::Low),
                },
                "recommendations": recommendations,
                "alerts": alerts.iter().take(5).collect::<Vec<_>>(),
            }
        }))
    }
}

/// Start of a look-back window of `hours` ending at `now`.
fn window_start(now: NaiveDateTime, hours: i64) -> Result<NaiveDateTime> {
    Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| FleetError::invalid(format!("time_window out of range: {}", hours)))
}

#[async_trait]
impl Tool for SecurityMonitor {
    fn name(&self) -> &str {
        "ueba_security_monitor"
    }

    fn description(&self) -> &str {
        "Monitors agent behaviour for security threats: establishes baselines, detects anomalies, \
         scores threats and keeps a security event log with alerts."
    }

    fn actions(&self) -> &[&'static str] {
        ACTIONS
    }

    fn schemas(&self) -> Value {
        let schema = json!(schemars::schema_for!(SecurityInput));
        ACTIONS
            .iter()
            .map(|action| (action.to_string(), schema.clone()))
            .collect::<Map<_, _>>()
            .into()
    }

    async fn execute(&self, action: &str, args: &Value) -> Result<Value> {
        if !ACTIONS.contains(&action) {
            return Err(FleetError::unknown_action(action, ACTIONS));
        }
        let input: SecurityInput = parse_args(action, args)?;
        let agent_id = input.agent_id.as_str();
        let event_data = input.event_data.unwrap_or_default();

        match action {
            "establish_baseline" => {
                let baseline = self.establish_baseline(agent_id, event_data);
                Ok(json!({
                    "status": "success",
                    "message": format!("Baseline established for agent {}", agent_id),
                    "baseline_metrics": baseline.metrics,
                    "sample_count": baseline.sample_count,
                }))
            }
            "detect_anomaly" => {
                let (anomalies, score) = self.detect_anomaly(agent_id, &event_data, input.threshold)?;
                Ok(json!({
                    "status": "success",
                    "agent_id": agent_id,
                    "anomalies_detected": anomalies.len(),
                    "anomalies": anomalies,
                    "threat_score": score,
                    "analysis_timestamp": format_timestamp(self.clock.now()),
                }))
            }
            "log_event" => Ok(self.log_event(agent_id, event_data)),
            "get_threat_score" => Ok(self.threat_score_report(agent_id)),
            "analyze_behavior" => self.analyze_behavior(agent_id, input.time_window),
            "get_security_report" => self.security_report(agent_id, input.time_window),
            other => Err(FleetError::unknown_action(other, ACTIONS)),
        }
    }
}
