//! Query enrichment tools.
//!
//! Detection and invocation are separate: [`IntentClassifier`] turns the
//! query into a list of [`ToolIntent`]s, [`ToolRunner`] executes them and
//! appends each result to the query as JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_LOCATION: &str = "Area A";
pub const MOCK_WEATHER_KEY: &str = "mock_key";

const WEATHER_TRIGGERS_CJK: [&str; 2] = ["天气", "降雨"];
const COMPUTE_TRIGGERS: [&str; 3] = ["计算", "calculate", "compute"];
const SAFETY_TRIGGERS: [&str; 3] = ["安全系数", "safety factor", "factor of safety"];

// English triggers are whole words: "rain" must not fire on "drainage" or "terrain".
static WEATHER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(weather|rain|rainfall|rainy|raining)\b").expect("weather pattern is valid")
});

static PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(c|phi|gamma|h|beta)\s*=\s*(-?\d+(?:\.\d+)?)").expect("parameter pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherArgs {
    pub location: String,
    pub date: Option<String>,
}

/// Infinite-slope inputs: cohesion `c` (kPa), friction angle `phi` (deg),
/// unit weight `gamma` (kN/m³), depth `h` (m), slope angle `beta` (deg).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StabilityArgs {
    pub c: f64,
    pub phi: f64,
    pub gamma: f64,
    pub h: f64,
    pub beta: f64,
}

impl Default for StabilityArgs {
    fn default() -> Self {
        Self { c: 20.0, phi: 30.0, gamma: 18.0, h: 10.0, beta: 45.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolIntent {
    NoTool,
    WeatherTool(WeatherArgs),
    EngineeringTool(StabilityArgs),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn classify(&self, query: &str) -> Vec<ToolIntent> {
        let lower = query.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        let mut intents = Vec::new();
        if has(&WEATHER_TRIGGERS_CJK) || WEATHER_RE.is_match(query) {
            intents.push(ToolIntent::WeatherTool(WeatherArgs { location: DEFAULT_LOCATION.to_string(), date: None }));
        }
        if has(&COMPUTE_TRIGGERS) && has(&SAFETY_TRIGGERS) {
            intents.push(ToolIntent::EngineeringTool(stability_args(query)));
        }
        if intents.is_empty() {
            intents.push(ToolIntent::NoTool);
        }
        intents
    }
}

/// `name=value` pairs found in the query override the defaults.
pub fn stability_args(query: &str) -> StabilityArgs {
    let mut args = StabilityArgs::default();
    for cap in PARAM_RE.captures_iter(query) {
        let Ok(value) = cap[2].parse::<f64>() else { continue };
        match cap[1].to_ascii_lowercase().as_str() {
            "c" => args.c = value,
            "phi" => args.phi = value,
            "gamma" => args.gamma = value,
            "h" => args.h = value,
            "beta" => args.beta = value,
            _ => {}
        }
    }
    args
}

/// Infinite-slope factor of safety without pore pressure:
/// `Fs = (c + γ·h·cos²β·tanφ) / (γ·h·sinβ·cosβ)`.
pub fn stability_factor(args: &StabilityArgs) -> Value {
    let beta = args.beta.to_radians();
    let phi = args.phi.to_radians();
    let numerator = args.c + args.gamma * args.h * beta.cos().powi(2) * phi.tan();
    let denominator = args.gamma * args.h * beta.sin() * beta.cos();
    if denominator.abs() < 1e-12 {
        return json!({ "error": "Denominator is zero" });
    }
    let fs = numerator / denominator;
    if !fs.is_finite() {
        return json!({ "error": "Factor of safety is not finite" });
    }
    let status = if fs > 1.3 { "Stable" } else if fs < 1.0 { "Unstable" } else { "Critical" };
    json!({
        "Fs": (fs * 1000.0).round() / 1000.0,
        "status": status,
        "params": args,
    })
}

pub struct WeatherTool {
    client: Client,
    api_url: String,
    api_key: String,
}

impl WeatherTool {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn is_mock(&self) -> bool {
        self.api_key == MOCK_WEATHER_KEY
    }

    /// Never fails: transport or API errors come back as `{"error": msg}`.
    pub async fn query(&self, args: &WeatherArgs) -> Value {
        if self.is_mock() {
            return json!({
                "city": args.location,
                "date": args.date.clone().unwrap_or_else(|| "today".to_string()),
                "condition": "Heavy Rain",
                "temperature_c": 22.5,
                "precip_mm": 55.0,
                "is_mock": true,
            });
        }
        match self.fetch(args).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "Weather lookup failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn fetch(&self, args: &WeatherArgs) -> anyhow::Result<Value> {
        let mut params = vec![("key", self.api_key.clone()), ("q", args.location.clone())];
        if let Some(d) = &args.date {
            params.push(("dt", d.clone()));
        }
        let resp = self.client.get(format!("{}/history.json", self.api_url)).query(&params).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

pub struct ToolRunner {
    classifier: IntentClassifier,
    weather: WeatherTool,
}

impl ToolRunner {
    pub fn new(weather: WeatherTool) -> Self {
        Self { classifier: IntentClassifier, weather }
    }

    /// Run every detected tool and append its result to the query.
    pub async fn enrich(&self, query: &str) -> String {
        let mut enriched = query.to_string();
        for intent in self.classifier.classify(query) {
            match intent {
                ToolIntent::NoTool => {}
                ToolIntent::WeatherTool(args) => {
                    let info = self.weather.query(&args).await;
                    tracing::info!(tool = "weather", result = %info, "Tool used");
                    enriched.push_str(&format!(" (当前天气状况: {})", info));
                }
                ToolIntent::EngineeringTool(args) => {
                    let calc = stability_factor(&args);
                    tracing::info!(tool = "engineering", result = %calc, "Tool used");
                    enriched.push_str(&format!(" (计算参考: {})", calc));
                }
            }
        }
        enriched
    }
}
