use glam::Vec2;
use weathersim::config::WorldConfig;
use weathersim::field::FieldDecl;
use weathersim::fields::{self, channel};
use weathersim::{EdgeMode, Engine, Forcing, ForcingMode, Grid, GridUv, SimError, kernel_fn};

fn flat_world(size: usize) -> WorldConfig {
    let mut config = WorldConfig {
        width: size,
        height: size,
        ..WorldConfig::default()
    };
    config.terrain.max_elevation = 0.0;
    config
}

fn set_surface(engine: &mut Engine, f: impl FnMut(usize, usize, &mut [f32])) {
    let store = engine.store_mut();
    let id = store.id(fields::SURFACE.name).unwrap();
    store.init_front(id, f);
}

fn sum_channel(engine: &Engine, name: &str, channel: usize) -> f64 {
    engine
        .read_field(name)
        .unwrap()
        .channel(channel)
        .map(f64::from)
        .sum()
}

#[test]
fn every_written_field_swaps_each_tick() {
    let config = flat_world(16);
    let mut engine = Engine::from_config(&config).unwrap();
    let before: Vec<_> = engine.store().fields().map(|(_, f)| f.front_id()).collect();

    let report = engine.tick(&config.params, &Forcing::inactive()).unwrap();
    assert_eq!(report.swapped.len(), engine.store().len());

    for ((_, field), old) in engine.store().fields().zip(&before) {
        assert_ne!(field.front_id(), *old, "field {}", field.name());
        assert_eq!(field.last_written(), Some(0));
    }

    engine.tick(&config.params, &Forcing::inactive()).unwrap();
    for ((_, field), old) in engine.store().fields().zip(&before) {
        assert_eq!(field.front_id(), *old);
    }
    assert_eq!(engine.ticks(), 2);
}

#[test]
fn pressure_without_divergence_decays_to_zero() {
    let mut config = flat_world(16);
    config.initial.low_humidity = 0.0;
    config.initial.high_humidity = 0.0;
    let mut engine = Engine::from_config(&config).unwrap();

    let store = engine.store_mut();
    for (name, p) in [(fields::STATE_LOW.name, 1.0), (fields::STATE_HIGH.name, 0.5)] {
        let id = store.id(name).unwrap();
        store.init_front(id, |_, _, t| t[channel::PRESSURE] = p);
    }

    for _ in 0..300 {
        engine.tick(&config.params, &Forcing::inactive()).unwrap();
    }
    for name in [fields::STATE_LOW.name, fields::STATE_HIGH.name] {
        let stats = engine.read_field(name).unwrap().stats(channel::PRESSURE);
        assert!(stats.max.abs() < 1e-6 && stats.min.abs() < 1e-6, "{name}: {stats:?}");
    }
    let wind = engine.read_field(fields::VELOCITY_LOW.name).unwrap().stats(0);
    assert!(wind.max.abs() < 1e-6);
}

#[test]
fn water_bump_never_rises_above_its_peak() {
    let mut config = flat_world(24);
    config.initial.low_humidity = 0.0;
    config.initial.high_humidity = 0.0;
    config.params.hydrology.k_uptake = 0.0;
    config.params.hydrology.evaporation_rate = 0.0;
    let mut engine = Engine::from_config(&config).unwrap();

    set_surface(&mut engine, |x, y, t| {
        let d = Vec2::new(x as f32 - 12.0, y as f32 - 12.0).length();
        t[channel::ELEVATION] = (1.0 - d / 6.0).max(0.0);
        t[channel::WATER] = if d < 3.0 { 0.5 } else { 0.05 };
    });

    let peak = |engine: &Engine| {
        let surface = engine.read_field(fields::SURFACE.name).unwrap();
        let grid = engine.grid();
        (0..grid.height)
            .flat_map(|y| (0..grid.width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let t = surface.at(x, y);
                t[channel::ELEVATION] + t[channel::WATER]
            })
            .fold(f32::NEG_INFINITY, f32::max)
    };

    let mut last = peak(&engine);
    for _ in 0..200 {
        engine.tick(&config.params, &Forcing::inactive()).unwrap();
        let now = peak(&engine);
        assert!(now <= last + 1e-6, "peak rose from {last} to {now}");
        last = now;

        let water = engine.read_field(fields::SURFACE.name).unwrap().stats(channel::WATER);
        assert!(water.min >= 0.0);
        assert_eq!(water.non_finite, 0);
    }
}

#[test]
fn elevation_brush_bump_never_rises_with_default_hydrology() {
    let mut config = flat_world(24);
    config.initial.low_humidity = 0.0;
    config.initial.high_humidity = 0.0;
    let mut engine = Engine::from_config(&config).unwrap();

    let bump = Forcing {
        position: GridUv(Vec2::new(0.5, 0.5)),
        radius: 0.25,
        strength: 0.5,
        mode: ForcingMode::Elevation,
        active: true,
    };
    engine.tick(&config.params, &bump).unwrap();

    let peaks = |engine: &Engine| {
        let surface = engine.read_field(fields::SURFACE.name).unwrap();
        let grid = engine.grid();
        let mut elevation = f32::NEG_INFINITY;
        let mut level = f32::NEG_INFINITY;
        for y in 0..grid.height {
            for x in 0..grid.width {
                let t = surface.at(x, y);
                elevation = elevation.max(t[channel::ELEVATION]);
                level = level.max(t[channel::ELEVATION] + t[channel::WATER]);
            }
        }
        (elevation, level)
    };

    let (mut elevation, mut level) = peaks(&engine);
    assert!((elevation - 0.5).abs() < 1e-6);
    for tick in 0..500 {
        engine.tick(&config.params, &Forcing::inactive()).unwrap();
        let (e, l) = peaks(&engine);
        assert!(e <= elevation + 1e-6, "tick {tick}: elevation {elevation} -> {e}");
        assert!(l <= level + 1e-6, "tick {tick}: level {level} -> {l}");
        (elevation, level) = (e, l);
    }
}

#[test]
fn diverging_wind_does_not_fail_the_tick() {
    for speed in [-1e30, f32::INFINITY] {
        let config = flat_world(8);
        let mut engine = Engine::from_config(&config).unwrap();
        let store = engine.store_mut();
        let wind = store.id(fields::VELOCITY_LOW.name).unwrap();
        store.init_front(wind, |x, y, t| {
            if (x, y) == (3, 3) {
                t[0] = speed;
            }
        });

        for _ in 0..5 {
            let report = engine.tick(&config.params, &Forcing::inactive());
            assert!(report.is_ok(), "speed {speed}: {report:?}");
        }
        assert_eq!(engine.ticks(), 5);
    }
}

#[test]
fn water_is_conserved_between_surface_and_air() {
    let mut config = flat_world(16);
    config.initial.low_humidity = 0.7;
    config.initial.high_humidity = 0.4;
    config.initial.water_depth = 0.5;
    config.params.hydrology.evaporation_rate = 0.05;
    let mut engine = Engine::from_config(&config).unwrap();

    let total = |engine: &Engine| {
        sum_channel(engine, fields::STATE_LOW.name, channel::HUMIDITY)
            + sum_channel(engine, fields::STATE_HIGH.name, channel::HUMIDITY)
            + sum_channel(engine, fields::SURFACE.name, channel::WATER)
            + sum_channel(engine, fields::MIXING.name, channel::PRECIP_LOW)
            + sum_channel(engine, fields::MIXING.name, channel::PRECIP_HIGH)
    };

    let start = total(&engine);
    for _ in 0..30 {
        engine.tick(&config.params, &Forcing::inactive()).unwrap();
    }
    let end = total(&engine);
    assert!((start - end).abs() < 1e-3 * start, "{start} -> {end}");

    // осадки действительно выпадали
    let surface_water = sum_channel(&engine, fields::SURFACE.name, channel::WATER);
    assert!(surface_water > 0.5 * 256.0 * 0.9);
}

#[test]
fn dry_air_lets_all_light_through() {
    let mut config = flat_world(16);
    config.initial.low_humidity = 0.0;
    config.initial.high_humidity = 0.0;
    config.params.hydrology.evaporation_rate = 0.0;
    let mut engine = Engine::from_config(&config).unwrap();

    for _ in 0..3 {
        engine.tick(&config.params, &Forcing::inactive()).unwrap();
    }
    let light = engine.read_field(fields::LIGHT.name).unwrap();
    let t = light.stats(channel::TRANSMITTANCE);
    assert!((t.min - 1.0).abs() < 1e-6);
    let lower = light.stats(channel::CLOUD_LOWER);
    assert_eq!(lower.min, config.params.light.top_altitude);
}

#[test]
fn elevation_brush_raises_a_feathered_bump() {
    let config = flat_world(16);
    let mut engine = Engine::from_config(&config).unwrap();
    let forcing = Forcing {
        position: GridUv(Vec2::new(0.5, 0.5)),
        radius: 0.25,
        strength: 0.5,
        mode: ForcingMode::Elevation,
        active: true,
    };
    engine.tick(&config.params, &forcing).unwrap();

    let surface = engine.read_field(fields::SURFACE.name).unwrap();
    assert!((surface.at(8, 8)[channel::ELEVATION] - 0.5).abs() < 1e-6);
    let side = surface.at(10, 8)[channel::ELEVATION];
    assert!(side > 0.0 && side < 0.5);
    assert_eq!(surface.at(0, 0)[channel::ELEVATION], 0.0);

    // воздействие не сохраняется между тиками
    engine.tick(&config.params, &Forcing::inactive()).unwrap();
    let surface = engine.read_field(fields::SURFACE.name).unwrap();
    assert!((surface.at(8, 8)[channel::ELEVATION] - 0.5).abs() < 1e-6);
}

#[test]
fn velocity_brush_only_touches_its_layer() {
    let config = flat_world(16);
    let mut engine = Engine::from_config(&config).unwrap();
    let forcing = Forcing {
        position: GridUv(Vec2::new(0.5, 0.5)),
        radius: 0.2,
        strength: 1.0,
        mode: ForcingMode::VelocityLow {
            velocity: Vec2::new(1.0, 0.0),
        },
        active: true,
    };
    engine.tick(&config.params, &forcing).unwrap();

    let low = engine.read_field(fields::VELOCITY_LOW.name).unwrap().at(8, 8);
    assert!((low[0] - 1.0).abs() < 1e-6);
    assert!(low[1].abs() < 1e-6);
    let high = engine.read_field(fields::VELOCITY_HIGH.name).unwrap().stats(0);
    assert!(high.max.abs() < 1e-6);
}

#[test]
fn wind_carries_humidity_downstream() {
    let mut config = flat_world(16);
    config.initial.low_humidity = 0.0;
    config.initial.high_humidity = 0.0;
    config.params.hydrology.evaporation_rate = 0.0;
    config.params.pressure.k_pressure = 0.0;
    config.params.atmosphere.friction_low = 0.0;
    let mut engine = Engine::from_config(&config).unwrap();

    let store = engine.store_mut();
    let wind = store.id(fields::VELOCITY_LOW.name).unwrap();
    store.init_front(wind, |_, _, t| t[0] = 1.0);
    let state = store.id(fields::STATE_LOW.name).unwrap();
    store.init_front(state, |x, y, t| {
        t[channel::HUMIDITY] = if (x, y) == (4, 4) { 0.3 } else { 0.0 };
    });

    engine.tick(&config.params, &Forcing::inactive()).unwrap();
    let state = engine.read_field(fields::STATE_LOW.name).unwrap();
    assert!((state.at(5, 4)[channel::HUMIDITY] - 0.3).abs() < 1e-5);
    assert!(state.at(4, 4)[channel::HUMIDITY].abs() < 1e-5);
}

#[test]
fn pipeline_configuration_errors_name_field_and_pass() {
    let mut engine = Engine::new(Grid::new(8, 8).unwrap());
    engine.create_field("heat", 1, &[0.0], EdgeMode::Wrap).unwrap();
    engine.create_field("wind", 2, &[0.0, 0.0], EdgeMode::Wrap).unwrap();

    let err = engine
        .register_pass(
            "diffuse",
            &[FieldDecl::new("cold", 1)],
            &[FieldDecl::new("heat", 1)],
            kernel_fn(|_, _, _, _| {}),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        SimError::UnknownField { ref field, ref pass } if field == "cold" && pass == "diffuse"
    ));

    let err = engine
        .register_pass(
            "blow",
            &[FieldDecl::new("wind", 1)],
            &[FieldDecl::new("heat", 1)],
            kernel_fn(|_, _, _, _| {}),
        )
        .unwrap_err();
    assert!(matches!(err, SimError::ChannelMismatch { expected: 1, found: 2, .. }));

    let heat = [FieldDecl::new("heat", 1)];
    engine
        .register_pass("first", &[], &heat, kernel_fn(|_, _, _, _| {}))
        .unwrap();
    let err = engine
        .register_pass("second", &[], &heat, kernel_fn(|_, _, _, _| {}))
        .unwrap_err();
    assert!(err.to_string().contains("first") && err.to_string().contains("second"));
}

#[test]
fn custom_pass_runs_through_engine() {
    let mut engine = Engine::new(Grid::new(4, 4).unwrap());
    engine.create_field("count", 1, &[0.0], EdgeMode::Clamp).unwrap();
    let count = FieldDecl::new("count", 1);
    engine
        .register_pass(
            "count",
            &[count],
            &[count],
            kernel_fn(|x, y, src, out| {
                let v = src.field(0).at(x, y)[0];
                out.set(0, [v + src.params.dt, 0.0, 0.0, 0.0]);
            }),
        )
        .unwrap();

    let mut params = weathersim::SimParams::default();
    params.dt = 0.5;
    for _ in 0..4 {
        engine.tick(&params, &Forcing::inactive()).unwrap();
    }
    assert_eq!(engine.read_field("count").unwrap().at(3, 3)[0], 2.0);
}

#[test]
fn invalid_params_are_rejected_before_the_tick() {
    let config = flat_world(8);
    let mut engine = Engine::from_config(&config).unwrap();
    let mut params = config.params.clone();
    params.pressure.decay = 1.5;
    assert!(matches!(
        engine.tick(&params, &Forcing::inactive()),
        Err(SimError::InvalidParams(_))
    ));
    assert_eq!(engine.ticks(), 0);
}
