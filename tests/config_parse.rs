use voucher_batch::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../voucher-batch.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.batching.max_batch_size, 10);
    assert!(!cfg.paths.out_dir.is_empty());
    assert_eq!(cfg.remote.timeout_seconds, 600);
}

#[test]
fn missing_sections_use_defaults() {
    let cfg: Config = toml::from_str("[batching]\nmax_batch_size = 4\n").expect("parse TOML");
    assert_eq!(cfg.batching.max_batch_size, 4);
    assert_eq!(cfg.progress.tick_millis, 2000);
    assert!((cfg.progress.cap_fraction - 0.9).abs() < f64::EPSILON);
}

#[test]
fn rejects_bad_values() {
    let mut cfg = Config::default();
    cfg.batching.max_batch_size = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.progress.cap_fraction = 1.0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.progress.tick_millis = 0;
    assert!(cfg.validate().is_err());
}
