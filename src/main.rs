//! Rugby feature builder CLI
//!
//! Builds a team-level modeling table from raw match results.

use clap::{Parser, Subcommand};
use rugby::{Config, Result};

#[derive(Parser)]
#[command(name = "rugby-features")]
#[command(about = "Leakage-safe team features from rugby match results", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the modeling table (features plus target)
    Build {
        /// Raw match CSV, one row per match
        #[arg(short, long)]
        input: String,
        /// Output file
        #[arg(short, long)]
        output: String,
        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
        /// Write every team-level column instead of only features and target
        #[arg(long)]
        all_columns: bool,
    },
    /// Summarise a raw match file without transforming it
    Inspect {
        /// Raw match CSV, one row per match
        #[arg(short, long)]
        input: String,
    },
    /// Write a default config file
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use csv or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Build {
            input,
            output,
            format,
            all_columns,
        } => commands::build(config, &input, &output, format, all_columns),
        Commands::Inspect { input } => commands::inspect(config, &input),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use rugby::data::{read_csv, write_csv, write_json};
    use rugby::pipeline::FeatureAssembler;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to adjust columns and competition lists", config_path);
        println!("  2. Run 'rugby-features inspect --input matches.csv'");
        println!("  3. Run 'rugby-features build --input matches.csv --output features.csv'");

        Ok(())
    }

    pub fn build(
        config: Config,
        input: &str,
        output: &str,
        format: OutputFormat,
        all_columns: bool,
    ) -> Result<()> {
        let matches = read_csv(input)?;
        println!("Loaded {} matches from {}", matches.height(), input);

        let assembler = FeatureAssembler::new(config)?;
        let table = if all_columns {
            assembler.team_table(&matches)?
        } else {
            assembler.assemble(&matches)?.to_table()?
        };

        match format {
            OutputFormat::Csv => write_csv(&table, output)?,
            OutputFormat::Json => write_json(&table, output)?,
        }
        println!(
            "Wrote {} rows x {} columns to {}",
            table.height(),
            table.width(),
            output
        );

        Ok(())
    }

    pub fn inspect(config: Config, input: &str) -> Result<()> {
        let matches = read_csv(input)?;
        let assembler = FeatureAssembler::new(config)?;
        let summary = assembler.inspect(&matches)?;

        println!("Match Data");
        println!("───────────────────────────────");
        println!("  File:           {}", input);
        println!("  Matches:        {}", summary.matches);
        println!("  Teams:          {}", summary.teams);
        println!("  Nil-all draws:  {}", summary.nil_draws);
        println!("  Excluded:       {}", summary.excluded);
        println!("  International:  {}", summary.international);
        println!("  Club:           {}", summary.club);
        println!("  Unknown:        {}", summary.unknown);

        Ok(())
    }
}
