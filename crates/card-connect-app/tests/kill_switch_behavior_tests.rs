//! Integration tests for the delivery kill switch.

use card_connect_app::AppConfig;

fn config_with_switch(value: Option<&'static str>) -> AppConfig {
    AppConfig::from_lookup(move |key: &str| {
        (key == "CARD_CONNECT_DELIVERY_ENABLED")
            .then_some(value)
            .flatten()
            .map(str::to_string)
    })
    .expect("switch values never fail to load")
}

#[test]
fn kill_switch_behavior_tests_unset_switch_enables_delivery() {
    assert!(config_with_switch(None).delivery_enabled);
}

#[test]
fn kill_switch_behavior_tests_false_values_disable_delivery() {
    for value in ["false", "FALSE", " off ", "0"] {
        assert!(
            !config_with_switch(Some(value)).delivery_enabled,
            "{value:?} should disable delivery"
        );
    }
}

#[test]
fn kill_switch_behavior_tests_other_values_keep_delivery_enabled() {
    for value in ["yes", "1", "true", ""] {
        assert!(
            config_with_switch(Some(value)).delivery_enabled,
            "{value:?} should keep delivery enabled"
        );
    }
}
