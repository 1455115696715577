use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::process::exit;

use mpegdump::config::{create_default_config_template, AnalyzerConfig};
use mpegdump::format::Timeline;
use mpegdump::playlist::{analyze_input, analyze_playlist, Analysis};
use mpegdump::utils::ByteSource;
use mpegdump::Result;

const USAGE: &str = "usage: mpegdump [--tsv] <playlist.m3u8 | file.ts | file.mpg>\n       \
                     mpegdump --init-config [path]";
const DEFAULT_CONFIG_PATH: &str = "mpegdump.toml";

fn analyze_file(path: &Path, config: &AnalyzerConfig) -> Result<Analysis> {
    let file = BufReader::new(File::open(path)?);
    let mut source = ByteSource::new(file).with_peek_size(config.initial_peek_size);
    analyze_input(&path.display().to_string(), &mut source, config)
}

fn print_timeline(timeline: &Timeline) {
    for pid in timeline.pids() {
        println!();
        println!("METADATA FOR PROGRAM {}", pid);
        for event in timeline.events(pid) {
            println!("{}", event);
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut tsv = false;
    let mut init_config = false;
    let mut input = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--tsv" => tsv = true,
            "--init-config" => init_config = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return;
            }
            _ => input = Some(arg),
        }
    }
    if init_config {
        let path = input.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        if let Err(e) = create_default_config_template(&path) {
            eprintln!("{}: {}", path, e);
            exit(1);
        }
        println!("Config template written to {}", path);
        return;
    }

    let Some(input) = input else {
        eprintln!("{}", USAGE);
        exit(2);
    };

    let config = match AnalyzerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            exit(2);
        }
    };

    let path = Path::new(&input);
    let is_playlist = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("m3u8"));
    let result = if is_playlist {
        analyze_playlist(path, &config).await
    } else {
        analyze_file(path, &config)
    };

    let analysis = match result {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("{}: {}", input, e);
            exit(1);
        }
    };

    if tsv {
        if let Err(e) = analysis.report.write_tsv(io::stdout().lock()) {
            eprintln!("{}", e);
            exit(1);
        }
    } else {
        print!("{}", analysis.report);
        print_timeline(&analysis.timeline);
    }
}
