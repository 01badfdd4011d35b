use clap::{Parser, Subcommand};
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;

use teds_rust::teds_common_rs::record::core::bytes_to_hex;
use teds_rust::teds_common_rs::record::debug::{format_field_listing, RecordDebugLogger};
use teds_rust::teds_common_rs::record::TedsEncoder;
use teds_rust::teds_common_rs::sources::{CachedFieldSource, ConResBounds, FieldSheetLoader, FieldSource};
use teds_rust::teds_common_rs::transport::{FileBank, MemoryBank, TedsWriter};
use teds_rust::teds_common_rs::utils::config_loader::{ConfigLoader, TedsConfig};
use teds_rust::teds_common_rs::utils::log_config::init_logging;

#[derive(Parser)]
#[command(name = "teds-writer")]
#[command(about = "TEDS Writer - IEEE 1451.4 TEDS record encoder")]
#[command(version = "0.1.0")]
struct Cli {
    /// 設定ファイル (TOML / JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// フィールドシート (TOML / JSON)
    #[arg(short, long)]
    fields: Option<PathBuf>,

    /// デバッグモード
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 書き込むデータを表示
    Show,
    /// レコードを符号化して16進表示
    Encode,
    /// レコードをメモリバンクイメージに書き込み、読み戻して検証
    Write {
        /// バンクイメージファイル
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// 読み戻し検証を省略
        #[arg(long)]
        no_verify: bool,
    },
    /// メモリバンクイメージを 0 で消去
    Clear {
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// メモリバンクイメージのブロックチェックサムを検証
    Verify {
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// 検証するブロック数（省略時は初期化パターンから外れたブロックまで）
        #[arg(short, long)]
        blocks: Option<usize>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<TedsConfig, Box<dyn Error>> {
    let loader = match path {
        Some(p) => ConfigLoader::with_paths(vec![p.clone()]),
        None => ConfigLoader::new(),
    };
    Ok(loader.load()?)
}

fn image_path(arg: Option<PathBuf>, config: &TedsConfig) -> Result<PathBuf, Box<dyn Error>> {
    arg.or_else(|| config.device.image_path.clone())
        .ok_or_else(|| "no bank image given (use --image or device.image_path)".into())
}

fn field_source(cli_path: Option<PathBuf>, config: &TedsConfig) -> CachedFieldSource<FieldSheetLoader> {
    let path = cli_path.unwrap_or_else(|| config.source.fields_path.clone());
    let loader = FieldSheetLoader::new(path);
    let loader = if config.source.strict_ranges { loader.with_validator(ConResBounds) } else { loader };
    CachedFieldSource::new(loader)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.logging, cli.debug);

    let encoder = TedsEncoder::new(config.encoder.to_encoder_config());
    let mut source = field_source(cli.fields, &config);

    match cli.command {
        Commands::Show => {
            let fields = source.get_fields()?;
            print!("{}", format_field_listing(&fields));
        }
        Commands::Encode => {
            let fields = source.get_fields()?;
            let record = encoder.encode(&fields)?;
            if cli.debug {
                RecordDebugLogger::log_record(&record);
            }
            println!("{}", record.to_hex());
        }
        Commands::Write { image, no_verify } => {
            let fields = source.get_fields()?;
            print!("{}", format_field_listing(&fields));
            let record = encoder.encode(&fields)?;
            if cli.debug {
                RecordDebugLogger::log_record(&record);
            }
            let path = image_path(image, &config)?;
            let mut bank = FileBank::open(&path, encoder.config().buffer_size)?;
            info!("Writing data to {}", bank.description());
            TedsWriter::new()
                .with_verify(config.device.verify && !no_verify)
                .write_record(&mut bank, &record)?;
            println!("{}", record.to_hex());
        }
        Commands::Clear { image } => {
            let path = image_path(image, &config)?;
            let mut bank = FileBank::open(&path, encoder.config().buffer_size)?;
            TedsWriter::new().clear(&mut bank)?;
            println!("Cleared {}", bank.description());
        }
        Commands::Verify { image, blocks } => {
            let path = image_path(image, &config)?;
            let mut bank = FileBank::open(&path, encoder.config().buffer_size)?;
            let data = TedsWriter::new().read_back(&mut bank)?;
            println!("{}", bytes_to_hex(&data));
            let verified = encoder.verify_image(&data, blocks)?;
            println!("{} block checksums OK", verified);
        }
    }
    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
