use std::io::Write;
use std::time::Duration;

use blockcam::config::Configuration;
use blockcam::{Backend, Color, PowerPreference};

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.backend, Backend::Auto);
    assert_eq!(cfg.power_preference, PowerPreference::HighPerformance);
    assert_eq!(cfg.dispatch_timeout, Duration::from_secs(10));
    assert_eq!(cfg.pixellate.block_size.get(), 16);
    assert_eq!(cfg.edges.background, Color::BLACK);
    assert_eq!(cfg.edges.tolerance, 0);
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
backend: cpu
power-preference: low-power
dispatch-timeout: 2s 500ms
pixellate:
  block-size: 24
edges:
  background: [255, 255, 255]
  tolerance: 6
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.backend, Backend::Cpu);
    assert_eq!(cfg.power_preference, PowerPreference::LowPower);
    assert_eq!(cfg.dispatch_timeout, Duration::from_millis(2500));
    assert_eq!(cfg.pixellate.block_size.get(), 24);
    assert_eq!(cfg.edges.background.to_rgba8(), [255, 255, 255, 255]);
    assert_eq!(cfg.edges.tolerance, 6);

    let reducer = cfg.reducer_config();
    assert_eq!(reducer.backend, Backend::Cpu);
    assert_eq!(reducer.gpu.dispatch_timeout, Duration::from_millis(2500));
}

#[test]
fn background_accepts_rgba_and_hex() {
    let cfg: Configuration = serde_yaml::from_str(
        r#"
edges:
  background: [1, 2, 3, 4]
"#,
    )
    .unwrap();
    assert_eq!(cfg.edges.background.to_rgba8(), [1, 2, 3, 4]);

    let cfg: Configuration = serde_yaml::from_str(
        r##"
edges:
  background: "#ff8000"
"##,
    )
    .unwrap();
    assert_eq!(cfg.edges.background.to_rgba8(), [255, 128, 0, 255]);
}

#[test]
fn rejects_bad_background() {
    let err = serde_yaml::from_str::<Configuration>(
        r#"
edges:
  background: [1, 2]
"#,
    );
    assert!(err.is_err());
}

#[test]
fn rejects_non_positive_block_size() {
    for yaml in ["pixellate:\n  block-size: 0\n", "pixellate:\n  block-size: -4\n"] {
        assert!(
            serde_yaml::from_str::<Configuration>(yaml).is_err(),
            "accepted {yaml:?}"
        );
    }
}

#[test]
fn rejects_unknown_backend() {
    assert!(serde_yaml::from_str::<Configuration>("backend: metal\n").is_err());
}

#[test]
fn zero_timeout_fails_validation() {
    let cfg: Configuration = serde_yaml::from_str("dispatch-timeout: 0s\n").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("dispatch-timeout"));
}

#[test]
fn load_reads_file_or_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "backend: gpu\npixellate:\n  block-size: 3").unwrap();
    let cfg = Configuration::load(Some(file.path())).unwrap();
    assert_eq!(cfg.backend, Backend::Gpu);
    assert_eq!(cfg.pixellate.block_size.get(), 3);

    let cfg = Configuration::load(None).unwrap();
    assert_eq!(cfg.backend, Backend::Auto);

    let missing = file.path().with_extension("missing");
    assert!(Configuration::load(Some(&missing)).is_err());
}
