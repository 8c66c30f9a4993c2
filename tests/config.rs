use std::path::PathBuf;

use weathersim::config::WorldConfig;
use weathersim::forcing::ForcingMode;
use weathersim::{Engine, SimError};

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/world.toml")
}

#[test]
fn demo_world_loads_and_runs() {
    let config = WorldConfig::from_toml_file(demo_path()).unwrap();
    assert_eq!(config.seed, 42);
    assert_eq!(config.params.hydrology.sea_level, Some(0.35));
    assert_eq!(config.forcing.len(), 2);
    assert!(matches!(
        config.forcing_at(10).mode,
        ForcingMode::VelocityAll { .. }
    ));
    assert_eq!(config.forcing_at(110).mode, ForcingMode::Precipitation);
    assert!(!config.forcing_at(60).active);

    let small = WorldConfig {
        width: 16,
        height: 16,
        ..config
    };
    let mut engine = Engine::from_config(&small).unwrap();

    // низины под уровнем моря сразу залиты
    let surface = engine.read_field("surface").unwrap();
    let grid = engine.grid();
    for y in 0..grid.height {
        for x in 0..grid.width {
            let t = surface.at(x, y);
            assert!(t[2] + t[3] >= 0.35 - 1e-6);
        }
    }

    for tick in 0..5 {
        let forcing = small.forcing_at(tick);
        engine.tick(&small.params, &forcing).unwrap();
    }
    assert_eq!(engine.ticks(), 5);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = WorldConfig::from_toml_file("definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, SimError::Io(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let dir = std::env::temp_dir().join(format!("weathersim-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.toml");
    std::fs::write(&path, "width = \"wide\"\n").unwrap();
    let err = WorldConfig::from_toml_file(&path).unwrap_err();
    assert!(matches!(err, SimError::Toml(_)));

    std::fs::write(&path, "[params.pressure]\ndecay = 2.0\n").unwrap();
    let err = WorldConfig::from_toml_file(&path).unwrap_err();
    assert!(matches!(err, SimError::InvalidParams(_)));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn zero_sized_world_is_rejected() {
    let config = WorldConfig {
        width: 0,
        ..WorldConfig::default()
    };
    assert!(matches!(
        Engine::from_config(&config),
        Err(SimError::InvalidGrid { .. })
    ));
}
