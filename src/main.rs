use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use search_filter::{get_filter_with_config, SearchConfig, SearchResult};
use std::path::PathBuf;
use std::process::ExitCode;

/// Compile search queries into API filter JSON
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config with default fields, depth limit and overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Field searched by bare terms (repeatable, overrides the config)
    #[arg(short = 'f', long = "default-field")]
    default_fields: Vec<String>,

    /// Maximum nesting depth, 1 to 512 (overrides the config)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Query to compile. Starts an interactive prompt when omitted.
    query: Option<String>,
}

fn load_config(cli: &Cli) -> Result<SearchConfig> {
    let mut config = match &cli.config {
        Some(path) => SearchConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SearchConfig::default(),
    };
    if !cli.default_fields.is_empty() {
        config.default_fields = cli.default_fields.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    config.validate()?;
    Ok(config)
}

fn print_result(result: &SearchResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn run_prompt(config: &SearchConfig) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Enter a search query (Ctrl-D to exit).");

    loop {
        match editor.readline("search> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = editor.add_history_entry(line.as_str()) {
                        log::debug!("could not add history entry: {}", e);
                    }
                }
                print_result(&get_filter_with_config(Some(&line), config))?;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.query {
        Some(query) => {
            let result = get_filter_with_config(Some(query), &config);
            print_result(&result)?;
            if result.error.is_some() {
                return Ok(ExitCode::FAILURE);
            }
        }
        None => run_prompt(&config)?,
    }
    Ok(ExitCode::SUCCESS)
}
