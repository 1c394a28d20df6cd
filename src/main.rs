use std::path::{Path, PathBuf};
use std::sync::Arc;
use tamperscan::cli::{Cli, Commands, ConfigAction};
use tamperscan::config::{Config, ConfigValidator};
use tamperscan::detection::Severity;
use tamperscan::document::load_documents;
use tamperscan::error::{Result, TamperError};
use tamperscan::fingerprint::FingerprintExtractor;
use tamperscan::patterns::{RuleRegistry, BUILTIN_RULES};
use tamperscan::report::{Analyzer, ReportFormat, ReportRenderer};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            documents,
            format,
            output,
            min_severity,
        } => {
            cmd_analyze(
                cli.config,
                cli.rules,
                &documents,
                format,
                output,
                &min_severity,
            )?;
        }
        Commands::Fingerprint { file } => {
            cmd_fingerprint(cli.config, cli.rules, &file)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "tamperscan=debug"
    } else {
        "tamperscan=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Reports go to stdout, so logs go to stderr
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_analyze(
    config_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    documents_path: &Path,
    format: Option<String>,
    output: Option<PathBuf>,
    min_severity: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = load_rules(rules_path, &config)?;

    let documents = load_documents(documents_path)?;
    tracing::info!(
        "Loaded {} document(s) from {}",
        documents.len(),
        documents_path.display()
    );

    let format: ReportFormat = format
        .as_deref()
        .unwrap_or(&config.report.default_format)
        .parse()?;
    let min_severity: Severity = min_severity.parse().map_err(TamperError::Input)?;

    let analyzer = Analyzer::new(Arc::new(registry), config.settings());
    let report = analyzer.analyze(&documents);
    let rendered = ReportRenderer::new(format)
        .with_min_severity(min_severity)
        .render(&report, &documents)?;

    match output {
        Some(path) => {
            std::fs::write(&path, rendered).map_err(|e| TamperError::Io {
                source: e,
                context: format!("Failed to write report: {:?}", path),
            })?;
            println!("✓ Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn cmd_fingerprint(
    config_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    file: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = load_rules(rules_path, &config)?;

    let text = std::fs::read_to_string(file).map_err(|e| TamperError::Io {
        source: e,
        context: format!("Failed to read text file: {:?}", file),
    })?;

    let fingerprint = FingerprintExtractor::new(Arc::new(registry)).extract(&text);
    let json = serde_json::to_string_pretty(&fingerprint).map_err(|e| TamperError::Json {
        source: e,
        context: "Failed to serialize fingerprint".to_string(),
    })?;
    println!("{}", json);

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| TamperError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            if let Some(rules) = &config.rules.rules_file {
                let registry = RuleRegistry::from_config_file(rules)?;
                println!("✓ Rule set is valid ({} rules)", registry.rule_count());
            }
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            let config_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&config_dir).map_err(|e| TamperError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", config_dir),
            })?;

            let rules_path = config_dir.join("rules.toml");
            if force || !rules_path.exists() {
                std::fs::write(&rules_path, BUILTIN_RULES).map_err(|e| TamperError::Io {
                    source: e,
                    context: format!("Failed to write rules.toml: {:?}", rules_path),
                })?;
            }

            let mut config = Config::default();
            config.rules.rules_file = Some(rules_path.clone());
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
            println!("✓ Rule set installed at: {}", rules_path.display());
        }
    }

    Ok(())
}

/// Explicit config paths must exist; the default location falls back to
/// built-in defaults
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = config_path {
        return Config::load(&path);
    }

    let path = Config::default_path()?;
    if !path.exists() {
        tracing::debug!(
            "Config file not found, using defaults. Run 'tamperscan config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    Config::load(&path)
}

/// `--rules` wins over the configured rule set, which wins over the built-in one
fn load_rules(rules_path: Option<PathBuf>, config: &Config) -> Result<RuleRegistry> {
    let registry = match rules_path.or_else(|| config.rules.rules_file.clone()) {
        Some(path) => RuleRegistry::from_config_file(&path)?,
        None => RuleRegistry::builtin()?,
    };
    tracing::debug!("Rule registry ready with {} rules", registry.rule_count());
    Ok(registry)
}
