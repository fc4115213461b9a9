use live_candles_wasm::application::ChartConfig;
use live_candles_wasm::domain::errors::ChartError;
use live_candles_wasm::domain::market_data::Channel;

#[test]
fn host_json_overrides_selected_keys() {
    let config = ChartConfig::from_json(
        r##"{
            "feedUrl": "wss://feed.example.test/ws",
            "historyUrl": "https://feed.example.test/bars?venue=xnas",
            "channels": ["quotes"],
            "containerPollMs": 50,
            "maxContainerPolls": 40,
            "resizeDebounceMs": 200,
            "reconnectMaxSecs": 60,
            "series": {"upColor": "#00ff00", "wickVisible": false}
        }"##,
    )
    .unwrap();

    assert_eq!(config.feed_url, "wss://feed.example.test/ws");
    assert_eq!(config.channels, vec![Channel::Quotes]);
    assert_eq!(config.max_container_polls, Some(40));
    assert_eq!(config.series.up_color, "#00ff00");
    assert!(!config.series.wick_visible);
    assert_eq!(config.series.down_color, "#ef5350");

    let lifecycle = config.lifecycle();
    assert_eq!(lifecycle.poll_interval_ms, 50);
    assert_eq!(lifecycle.max_poll_attempts, Some(40));
    assert_eq!(lifecycle.resize_debounce_ms, 200);
}

#[test]
fn invalid_values_are_rejected() {
    for json in [
        r#"{"historyLimit": 0}"#,
        r#"{"reconnectInitialSecs": 8, "reconnectMaxSecs": 4}"#,
        r#"{"minFrameIntervalMs": -1}"#,
        r#"{"channels": ["news"]}"#,
        "not json",
    ] {
        assert!(matches!(ChartConfig::from_json(json), Err(ChartError::InvalidInput(_))), "accepted {json}");
    }
}

#[test]
fn defaults_are_valid() {
    assert!(ChartConfig::default().validate().is_ok());
}
