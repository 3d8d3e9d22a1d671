use std::io::Write;

use serial_test::serial;

use super::*;

fn cli(args: &[&str]) -> CliArgs {
    CliArgs::parse_from(std::iter::once("freshstack").chain(args.iter().copied()))
}

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.cache, CacheConfig::default());
    assert_eq!(settings.popups.max_visible, 4);
    assert!(settings.api.base_url.is_none());
    assert_eq!(settings.api.timeout, Duration::from_secs(10));
    assert_eq!(settings.store.quota_bytes, Some(5 * 1024 * 1024));
    assert_eq!(settings.feed.poll_interval(), Duration::from_secs(15));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.cache.stale_ttl_secs = 3_600;
    raw.logging.level = Some("info".to_string());

    let overrides = Overrides {
        cache_stale_ttl_seconds: Some(7_200),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cache.stale_ttl(), Duration::from_secs(7_200));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_overrides(&Overrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn fresh_ttl_longer_than_stale_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.fresh_ttl_secs = 7_200;
    raw.cache.stale_ttl_secs = 3_600;

    let err = Settings::from_raw(raw).expect_err("ttl order must be enforced");
    assert!(matches!(err, LoadError::Invalid { key: "cache", .. }));
}

#[test]
fn invalid_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("url must parse");
    assert!(matches!(err, LoadError::Invalid { key: "api.base_url", .. }));
}

#[test]
fn zero_quota_disables_the_limit() {
    let mut raw = RawSettings::default();
    raw.store.quota_bytes = Some(0);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.store.quota_bytes, None);
}

#[test]
fn parse_fetch_arguments() {
    let args = cli(&[
        "--api-base-url",
        "https://dashboards.example.com/api",
        "fetch",
        "dashboard",
        "--param",
        "start=2025-06-01",
        "-p",
        "end=2025-06-07",
    ]);

    assert_eq!(
        args.overrides.api_base_url.as_deref(),
        Some("https://dashboards.example.com/api")
    );
    match args.command {
        Command::Fetch(fetch) => {
            assert_eq!(fetch.action, "dashboard");
            assert_eq!(
                fetch.params,
                vec![
                    ("start".to_string(), "2025-06-01".to_string()),
                    ("end".to_string(), "2025-06-07".to_string()),
                ]
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn malformed_param_is_rejected() {
    let result = CliArgs::try_parse_from(["freshstack", "fetch", "dashboard", "-p", "start"]);
    assert!(result.is_err());
}

#[test]
fn parse_inspect_with_key() {
    let args = cli(&["inspect", "dashboard?end=2025-06-07&start=2025-06-01"]);
    match args.command {
        Command::Inspect(inspect) => assert_eq!(
            inspect.key.as_deref(),
            Some("dashboard?end=2025-06-07&start=2025-06-01")
        ),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
#[serial]
fn file_then_env_then_cli() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(
        file,
        "[cache]\nstale_ttl_secs = 3600\nfresh_ttl_secs = 120\n\n[popups]\nmax_visible = 3"
    )
    .expect("write config");

    // SAFETY: serialized with every other test that touches the environment.
    unsafe {
        std::env::set_var("FRESHSTACK__CACHE__FRESH_TTL_SECS", "60");
    }

    let path = file.path().to_string_lossy().into_owned();
    let args = cli(&["--config-file", &path, "--popups-max-visible", "5", "sweep"]);
    let result = load(&args);

    unsafe {
        std::env::remove_var("FRESHSTACK__CACHE__FRESH_TTL_SECS");
    }

    let settings = result.expect("settings load");
    assert_eq!(settings.cache.stale_ttl(), Duration::from_secs(3_600));
    assert_eq!(settings.cache.fresh_ttl(), Duration::from_secs(60));
    assert_eq!(settings.popups.max_visible, 5);
}
