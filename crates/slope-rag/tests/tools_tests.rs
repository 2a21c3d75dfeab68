use std::time::Duration;

use slope_rag::tools::{
    stability_args, stability_factor, IntentClassifier, StabilityArgs, ToolIntent, ToolRunner, WeatherArgs, WeatherTool,
    DEFAULT_LOCATION, MOCK_WEATHER_KEY,
};

fn fs_of(args: &StabilityArgs) -> f64 {
    stability_factor(args)["Fs"].as_f64().unwrap()
}

#[test]
fn plain_question_needs_no_tool() {
    assert_eq!(IntentClassifier.classify("What is a retaining wall?"), vec![ToolIntent::NoTool]);
}

#[test]
fn weather_keywords_in_both_languages() {
    for q in ["今天的天气如何", "近期降雨对边坡的影响", "Will RAIN hit the site?", "weather outlook"] {
        let intents = IntentClassifier.classify(q);
        assert!(
            matches!(&intents[..], [ToolIntent::WeatherTool(WeatherArgs { location, date: None })] if location == DEFAULT_LOCATION),
            "{q}: {intents:?}"
        );
    }
}

#[test]
fn rain_inside_other_words_is_not_weather() {
    for q in [
        "How does drainage improve slope stability?",
        "What strain does the terrain show?",
        "Is geotextile training required for the crew?",
        "List the design constraints for the cut.",
    ] {
        assert_eq!(IntentClassifier.classify(q), vec![ToolIntent::NoTool], "{q}");
    }
    assert!(matches!(IntentClassifier.classify("Did rainfall trigger the slide?")[..], [ToolIntent::WeatherTool(_)]));
}

#[test]
fn engineering_needs_compute_and_safety_words() {
    assert_eq!(IntentClassifier.classify("What is the factor of safety?"), vec![ToolIntent::NoTool]);
    assert_eq!(IntentClassifier.classify("please calculate something"), vec![ToolIntent::NoTool]);
    let intents = IntentClassifier.classify("计算安全系数");
    assert_eq!(intents, vec![ToolIntent::EngineeringTool(StabilityArgs::default())]);
}

#[test]
fn both_tools_in_fixed_order() {
    let intents = IntentClassifier.classify("After heavy rain, compute the safety factor with c=10 beta=30");
    assert_eq!(intents.len(), 2);
    assert!(matches!(intents[0], ToolIntent::WeatherTool(_)));
    match &intents[1] {
        ToolIntent::EngineeringTool(args) => {
            assert_eq!(args.c, 10.0);
            assert_eq!(args.beta, 30.0);
            assert_eq!(args.phi, 30.0);
        }
        other => panic!("unexpected intent {other:?}"),
    }
}

#[test]
fn parameters_parse_case_insensitively() {
    let args = stability_args("PHI = 35.5, gamma=19 h=5.25 unrelated x=3");
    assert_eq!(args, StabilityArgs { c: 20.0, phi: 35.5, gamma: 19.0, h: 5.25, beta: 45.0 });
}

#[test]
fn default_slope_is_unstable() {
    let out = stability_factor(&StabilityArgs::default());
    assert!((out["Fs"].as_f64().unwrap() - 0.8).abs() < 1e-9);
    assert_eq!(out["status"], "Unstable");
    assert_eq!(out["params"]["c"], 20.0);
}

#[test]
fn status_thresholds() {
    let stable = StabilityArgs { c: 30.0, phi: 35.0, gamma: 19.0, h: 5.0, beta: 30.0 };
    assert!((fs_of(&stable) - 1.942).abs() < 0.002);
    assert_eq!(stability_factor(&stable)["status"], "Stable");

    // cohesionless: Fs = tan(phi) / tan(beta) ~ 1.213
    let critical = StabilityArgs { c: 0.0, phi: 35.0, gamma: 19.0, h: 5.0, beta: 30.0 };
    let fs = fs_of(&critical);
    assert!(fs >= 1.0 && fs <= 1.3, "{fs}");
    assert_eq!(stability_factor(&critical)["status"], "Critical");
}

#[test]
fn flat_ground_reports_error() {
    let out = stability_factor(&StabilityArgs { beta: 0.0, ..StabilityArgs::default() });
    assert!(out.get("Fs").is_none());
    assert!(out["error"].as_str().is_some());
}

#[tokio::test]
async fn mock_weather_is_offline() {
    let tool = WeatherTool::new("http://127.0.0.1:9", MOCK_WEATHER_KEY, Duration::from_secs(1)).unwrap();
    assert!(tool.is_mock());
    let v = tool.query(&WeatherArgs { location: "Area B".into(), date: Some("2024-05-01".into()) }).await;
    assert_eq!(v["city"], "Area B");
    assert_eq!(v["date"], "2024-05-01");
    assert_eq!(v["is_mock"], true);
}

#[tokio::test]
async fn unreachable_weather_api_yields_error_value() {
    let tool = WeatherTool::new("http://127.0.0.1:9", "real-key", Duration::from_secs(2)).unwrap();
    let v = tool.query(&WeatherArgs { location: DEFAULT_LOCATION.into(), date: None }).await;
    assert!(v["error"].as_str().is_some());
}

#[tokio::test]
async fn enrich_appends_tool_results() {
    let runner = ToolRunner::new(WeatherTool::new("http://127.0.0.1:9", MOCK_WEATHER_KEY, Duration::from_secs(1)).unwrap());
    assert_eq!(runner.enrich("retaining walls").await, "retaining walls");

    let enriched = runner.enrich("降雨后计算安全系数").await;
    let weather_at = enriched.find(" (当前天气状况: {").unwrap();
    let calc_at = enriched.find(" (计算参考: {").unwrap();
    assert!(enriched.starts_with("降雨后计算安全系数"));
    assert!(weather_at < calc_at);
    assert!(enriched.contains("\"status\":\"Unstable\""));
}
