use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, info_span, warn};

use address_validator::app::batch_use_case::BatchValidationUseCase;
use address_validator::config::Config;
use address_validator::constants::{is_valid_province_code, DEFAULT_CONFIG_PATH, DEFAULT_LOG_DIR};
use address_validator::infra::csv_input::read_batch_csv;
use address_validator::infra::csv_output_adapter::CsvValidationOutput;
use address_validator::infra::llm_reviewer::LlmReviewer;
use address_validator::infra::txt_convert::convert_txt_to_csv;
use address_validator::logging;
use address_validator::{AddressValidator, ReferenceIndex, ValidationResult};

#[derive(Parser)]
#[command(name = "address_validator")]
#[command(about = "Validate and normalize Spanish postal addresses")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Reference table path, overrides the config file
    #[arg(long, global = true)]
    reference: Option<PathBuf>,

    /// Run offline even if the LLM reviewer is enabled in the config
    #[arg(long, global = true)]
    no_llm: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a single address
    Validate {
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        postcode: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate every row of a CSV file
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Only process the first N rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Query the reference index
    Lookup {
        /// Two-digit province code
        #[arg(long, conflicts_with = "city", required_unless_present = "city")]
        province: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    /// Check a city against a postal code, without the other stages
    Match {
        #[arg(long)]
        city: String,
        #[arg(long)]
        postcode: String,
    },
    /// Turn a raw `address,city,zip,notes` dump into a batch CSV
    Convert {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn build_validator(
    index: Arc<ReferenceIndex>,
    config: &Config,
    no_llm: bool,
) -> Result<AddressValidator> {
    let validator = AddressValidator::offline(index)
        .with_rules(config.rules.clone())
        .with_max_known_cities(config.llm.max_known_cities);

    if !config.llm.enabled || no_llm {
        info!("LLM reviewer disabled, running offline");
        return Ok(validator);
    }

    let reviewer = Arc::new(LlmReviewer::new(&config.llm)?);
    info!(endpoint = reviewer.endpoint(), model = %config.llm.model, "LLM reviewer enabled");
    Ok(validator.with_classifier(reviewer.clone()).with_arbiter(reviewer))
}

fn print_result(result: &ValidationResult) {
    println!("Status:   {}", result.status);
    println!("Message:  {}", result.message);
    if let Some(road) = &result.parsed.road {
        println!("Road:     {}", road);
    }
    if let Some(city) = &result.parsed.city {
        println!("City:     {}", city);
    }
    if let Some(postcode) = &result.parsed.postcode {
        println!("Postcode: {}", postcode);
    }
    if let Some(city) = &result.normalized_city {
        println!("Normalized city: {}", city);
    }
    if let Some(intent) = result.intent {
        println!("Intent:   {} ({})", intent, result.confidence.map(|c| c.as_str()).unwrap_or("-"));
    }
    for violation in &result.rule_violations {
        println!("  - {}", violation);
    }
}

fn load_index(cli: &Cli, config: &Config) -> Result<Arc<ReferenceIndex>> {
    let reference_path = cli.reference.clone().unwrap_or_else(|| config.reference.path.clone());
    ReferenceIndex::shared(&reference_path, config.reference.collision_policy)
        .with_context(|| format!("loading reference table {}", reference_path.display()))
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging(std::path::Path::new(DEFAULT_LOG_DIR));

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;

    match &cli.command {
        Commands::Validate { address, city, postcode, json } => {
            let _span = info_span!("validate", address = %address).entered();
            let validator = build_validator(load_index(&cli, &config)?, &config, cli.no_llm)?;
            let result = validator.validate(address, city, postcode)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Commands::Batch { input, output, limit } => {
            let _span = info_span!("batch", input = %input.display()).entered();
            // Held here so the blocking HTTP client is dropped outside the runtime
            let index = load_index(&cli, &config)?;
            let validator = Arc::new(build_validator(index, &config, cli.no_llm)?);
            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

            let stats = runtime.block_on(async {
                let batch = read_batch_csv(input, &config.batch, *limit)?;
                if batch.rows.is_empty() {
                    warn!(path = %input.display(), "Input has no rows");
                }
                let writer = CsvValidationOutput::create(output, &batch.headers)?;
                let use_case = BatchValidationUseCase::new(validator.clone(), Box::new(writer))
                    .with_concurrency(config.batch.concurrency)
                    .with_progress_every(config.batch.progress_every);
                use_case.run(batch.rows).await
            })?;

            print!("{}", stats);
            println!("Results written to {}", output.display());
        }
        Commands::Lookup { province, city } => {
            let _span = info_span!("lookup").entered();
            let index = load_index(&cli, &config)?;
            if let Some(code) = province {
                if !is_valid_province_code(code) {
                    bail!("'{}' is not a province code (01-52)", code);
                }
                let cities = index.cities_for_province(code);
                println!("Province {}: {} cities", code, cities.len());
                for name in cities {
                    println!("  {}", name);
                }
            } else if let Some(name) = city {
                match index.province_for_city(name) {
                    Some(code) => println!("{} → province {}", name, code),
                    None => println!("{} not found in reference data", name),
                }
            }
        }
        Commands::Match { city, postcode } => {
            let _span = info_span!("match", city = %city, postcode = %postcode).entered();
            let validator = AddressValidator::offline(load_index(&cli, &config)?);
            let result = validator.matcher().validate(city, postcode);
            println!("Status:   {}", result.status);
            println!("Message:  {}", result.message);
            if let Some(code) = &result.province_code {
                println!("Province: {}", code);
            }
            if let Some(expected) = &result.expected_cities {
                println!("Expected one of: {}", expected.join(", "));
            }
        }
        Commands::Convert { input, output } => {
            let _span = info_span!("convert", input = %input.display()).entered();
            let stats = convert_txt_to_csv(input, output)?;
            println!(
                "Converted {} records ({} skipped) from {} to {}",
                stats.converted,
                stats.skipped,
                input.display(),
                output.display()
            );
        }
    }

    Ok(())
}
