use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use weathersim::field::ChannelStats;
use weathersim::{Engine, ViewMode, WorldConfig, save_view};

/// Безоконный запуск погодной симуляции
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Сколько тиков выполнить
    #[arg(short, long, default_value_t = 500)]
    ticks: u64,

    /// Каталог для снимков (по умолчанию: ./out)
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Сохранять снимки каждые K тиков (0 = только в конце)
    #[arg(short, long, default_value_t = 100)]
    every: u64,

    /// Какие поля сохранять (по умолчанию все)
    #[arg(short, long, value_enum)]
    view: Vec<ViewMode>,
}

/// Сводка по полям для stats.json
#[derive(Serialize)]
struct Summary {
    ticks: u64,
    fields: BTreeMap<String, Vec<ChannelStats>>,
}

fn save_snapshots(
    engine: &Engine,
    views: &[ViewMode],
    dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    for view in views {
        let path = dir.join(format!("{:06}_{}.png", engine.ticks(), view.file_stem()));
        save_view(engine, *view, &path)?;
        log::info!("saved {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    println!("🔍 Загрузка конфигурации...");
    let config = WorldConfig::from_toml_file(&cli.config)?;

    println!(
        "Создание мира (размер: {}×{}, сид {})...",
        config.width, config.height, config.seed
    );
    let mut engine = Engine::from_config(&config)?;

    let views = if cli.view.is_empty() {
        ViewMode::ALL.to_vec()
    } else {
        cli.view.clone()
    };
    fs::create_dir_all(&cli.output)?;

    println!("Симуляция {} тиков...", cli.ticks);
    for tick in 0..cli.ticks {
        let forcing = config.forcing_at(tick);
        let report = engine.tick(&config.params, &forcing)?;
        if !report.non_finite.is_empty() {
            log::warn!("tick {tick}: non-finite values in {:?}", report.non_finite);
        }
        if cli.every > 0 && engine.ticks() % cli.every == 0 {
            log::info!("tick {}", engine.ticks());
            save_snapshots(&engine, &views, &cli.output)?;
        }
    }
    if cli.every == 0 || engine.ticks() % cli.every != 0 {
        save_snapshots(&engine, &views, &cli.output)?;
    }

    let fields: BTreeMap<String, Vec<ChannelStats>> = engine
        .store()
        .fields()
        .map(|(id, field)| {
            let view = engine.store().front(id);
            let stats: Vec<ChannelStats> = (0..field.channels()).map(|c| view.stats(c)).collect();
            (field.name().to_string(), stats)
        })
        .collect();
    let summary = Summary {
        ticks: engine.ticks(),
        fields,
    };
    let stats_path = cli.output.join("stats.json");
    fs::write(&stats_path, serde_json::to_string_pretty(&summary)?)?;

    println!("Сохранение сводки в {}", stats_path.display());
    println!("\nГотово! Выполнено тиков: {}.", engine.ticks());
    Ok(())
}
