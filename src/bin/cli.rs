use clap::Parser;
use hexmap::distance::rings;
use hexmap::render::save_preview;
use hexmap::{Coord, GenerationParams, generate_world};
use std::path::PathBuf;

/// Генератор гексагональных карт с реками
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML (по умолчанию — встроенные параметры)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Переопределить сид из конфигурации
    #[arg(short, long)]
    seed: Option<u64>,

    /// Путь для сохранения превью (по умолчанию: ./map.png)
    #[arg(short, long, default_value = "map.png")]
    output: PathBuf,

    /// Размер клетки превью в пикселях
    #[arg(long, default_value_t = 12)]
    cell_size: u32,

    /// Вывести сводку по карте в JSON
    #[arg(long)]
    summary: bool,

    /// Вывести размеры BFS-колец вокруг клетки X Y
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    rings: Option<Vec<usize>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => {
            println!("Загрузка конфигурации из {}...", path.display());
            GenerationParams::from_toml_file(path)?
        }
        None => GenerationParams::default(),
    };
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }

    println!(
        "Генерация карты (размер: {}×{}, сид {})...",
        params.width, params.height, params.seed
    );
    let world = generate_world(&params)?;

    if cli.summary {
        println!("{}", serde_json::to_string_pretty(&world.summary())?);
    }

    if let Some(origin) = &cli.rings {
        let start = Coord::new(origin[0], origin[1]);
        let by_distance = rings(&world.grid, start, params.distance.max_distance)?;
        for (distance, cells) in &by_distance {
            println!("кольцо {distance}: {} клеток", cells.len());
        }
    }

    println!("Сохранение в {}", cli.output.display());
    save_preview(&world, cli.cell_size, &cli.output)?;

    println!("\nГотово! Карта сохранена.");
    Ok(())
}
