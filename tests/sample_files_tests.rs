//! The shipped sample files must stay loadable
use std::path::Path;

use pricewatch_lib::domain::Platform;
use pricewatch_lib::infrastructure::{AppConfig, NotificationMethod, parse_targets};

#[test]
fn sample_targets_are_all_valid() {
    let loaded = parse_targets(include_str!("../products.sample.json")).unwrap();
    assert!(loaded.rejected.is_empty(), "{:?}", loaded.rejected);
    assert_eq!(loaded.targets.len(), 3);

    let bikes = &loaded.targets[2];
    assert_eq!(bikes.platform, Platform::Blocket);
    assert!(bikes.filter.contains(3000.0));
    assert!(!bikes.filter.contains(9000.0));
    assert_eq!(loaded.targets[1].price_selector.as_deref(), Some("text_search_kr"));
}

#[test]
fn sample_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("pricewatch.sample.toml");
    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.notification.method, NotificationMethod::Log);
    assert_eq!(config.monitor.schedule_interval_hours, 24);
    assert_eq!(
        config.logging.module_filters.get("reqwest").map(String::as_str),
        Some("warn")
    );
}
