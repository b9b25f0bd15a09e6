use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fatstore::{Config, Volume};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FATSTORE_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    info!("Using image {:?}", config.image_path);

    match matches.subcommand() {
        Some(("format", sub)) => {
            let mut config = config;
            if let Some(block_size) = sub.get_one::<usize>("block-size") {
                config.block_size = *block_size;
            }
            if let Some(blocks) = sub.get_one::<usize>("blocks") {
                config.block_count = *blocks;
            }
            if let Some(files) = sub.get_one::<usize>("files") {
                config.max_files = *files;
            }
            config.validate()?;

            let volume = Volume::format(config)?;
            volume.save()?;
            let stats = volume.stats();
            println!(
                "formatted {:?}: {} blocks of {} bytes",
                volume.config().image_path, stats.total_blocks, stats.block_size
            );
        }
        Some(("put", sub)) => {
            let source = sub
                .get_one::<PathBuf>("source")
                .context("missing source path")?;
            let name = match sub.get_one::<String>("name") {
                Some(name) => name.clone(),
                None => source
                    .file_name()
                    .and_then(|n| n.to_str())
                    .context("source path has no usable file name")?
                    .to_string(),
            };
            let data = fs::read(source).with_context(|| format!("reading {:?}", source))?;

            let mut volume = Volume::open(config)?;
            let written = volume.put(&name, &data)?;
            volume.save()?;
            println!("{}: {} bytes", name, written);
        }
        Some(("get", sub)) => {
            let name = sub.get_one::<String>("name").context("missing file name")?;
            let mut volume = Volume::open(config)?;
            let data = volume.get(name)?;

            match sub.get_one::<PathBuf>("output") {
                Some(output) => {
                    fs::write(output, &data).with_context(|| format!("writing {:?}", output))?
                }
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&data)?;
                }
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").context("missing file name")?;
            let mut volume = Volume::open(config)?;
            volume.remove(name)?;
            volume.save()?;
        }
        Some(("ls", _)) => {
            let volume = Volume::open(config)?;
            for file in volume.list() {
                println!("{:<16} {:>10} {:>6}", file.name, file.size, file.blocks);
            }
        }
        Some(("stat", _)) => {
            let volume = Volume::open(config)?;
            println!("{}", serde_json::to_string_pretty(&volume.stats())?);
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}

fn cli() -> Command {
    Command::new("fatstore")
        .version("0.1.0")
        .about("Block-based file store with a FAT-chained transfer engine")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON configuration file")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("image")
                .long("image")
                .help("Store image path, overrides the configuration")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("format")
                .about("Create an empty store image")
                .arg(
                    Arg::new("block-size")
                        .long("block-size")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("blocks")
                        .long("blocks")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("files")
                        .long("files")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("put")
                .about("Copy a host file into the store")
                .arg(
                    Arg::new("source")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(Arg::new("name").long("name").help("Name inside the store")),
        )
        .subcommand(
            Command::new("get")
                .about("Copy a file out of the store")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a file")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(Command::new("ls").about("List files"))
        .subcommand(Command::new("stat").about("Print store usage as JSON"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("loading config {:?}", path))?
        }
        None => Config::default(),
    };
    if let Some(image) = matches.get_one::<PathBuf>("image") {
        config.image_path = image.clone();
    }
    Ok(config)
}
