use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "wpf-eval")]
#[command(about = "Scores wind power forecasting submissions", long_about = None)]
pub struct CliOptions {
    /// Submission archive (.zip, .tar.gz or .tgz), or a directory with --dir
    pub submission: PathBuf,

    /// Treat SUBMISSION as an already unpacked directory
    #[arg(long)]
    pub dir: bool,

    /// TOML evaluation config; built-in defaults when omitted
    #[arg(short, long, env = "WPF_EVAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write per-case scores to this CSV file
    #[arg(long)]
    pub cases_out: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

pub fn parse_args() -> CliOptions {
    CliOptions::parse()
}

pub fn parse_args_from<I, T>(args: I) -> Result<CliOptions, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    CliOptions::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_archive_cli() {
        let opts = parse_args_from(["wpf-eval", "submit.zip"]).expect("parse should succeed");
        assert_eq!(opts.submission, PathBuf::from("submit.zip"));
        assert!(!opts.dir);
        assert!(opts.cases_out.is_none());
        assert_eq!(opts.log_format, LogFormat::Text);
    }

    #[test]
    fn supports_directory_cli() {
        let opts = parse_args_from([
            "wpf-eval",
            "--dir",
            "--config",
            "eval.toml",
            "--cases-out",
            "cases.csv",
            "--log-format",
            "json",
            "team/",
        ])
        .expect("parse should succeed");
        assert!(opts.dir);
        assert_eq!(opts.config.as_deref(), Some(std::path::Path::new("eval.toml")));
        assert_eq!(
            opts.cases_out.as_deref().and_then(|p| p.to_str()),
            Some("cases.csv")
        );
        assert_eq!(opts.log_format, LogFormat::Json);
    }

    #[test]
    fn submission_is_required() {
        assert!(parse_args_from(["wpf-eval"]).is_err());
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(parse_args_from(["wpf-eval", "--log-format", "xml", "s.tgz"]).is_err());
    }
}
