//! wpf-eval entry point: CLI wiring, logging, config, and result output.

use std::process;

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wpf_eval::cli::{self, CliOptions, LogFormat};
use wpf_eval::config::EvalConfig;
use wpf_eval::eval::Evaluator;
use wpf_eval::io::export::export_cases_csv;
use wpf_eval::reporting::EvaluationReport;
use wpf_eval::submission;

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(cli: &CliOptions) -> anyhow::Result<EvalConfig> {
    let config = match &cli.config {
        Some(path) => EvalConfig::from_toml_file(path)?,
        None => EvalConfig::default(),
    };
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("invalid configuration ({} errors)", errors.len());
    }
    Ok(config)
}

fn run(cli: &CliOptions) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let evaluator = Evaluator::from_config(config);

    let evaluation = if cli.dir {
        evaluator.evaluate(&cli.submission)?
    } else {
        submission::run(&cli.submission, &evaluator)?
    };

    eprintln!("{}", EvaluationReport::new(&evaluation));

    if let Some(path) = &cli.cases_out {
        export_cases_csv(&evaluation.cases, path)
            .with_context(|| format!("failed to write case CSV to {}", path.display()))?;
        info!(path = %path.display(), cases = evaluation.cases.len(), "case scores written");
    }

    let json = serde_json::to_string(&evaluation.result)?;
    println!("{json}");
    Ok(())
}

fn main() {
    let cli = cli::parse_args();
    init_logging(cli.log_format);

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
