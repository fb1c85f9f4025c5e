use cfme::{HarnessConfig, Runner, Suite};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SuiteArg {
    CustomAttributes,
    Rss,
    All,
}

impl From<SuiteArg> for Suite {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::CustomAttributes => Suite::CustomAttributes,
            SuiteArg::Rss => Suite::Rss,
            SuiteArg::All => Suite::All,
        }
    }
}

/// Runs the appliance REST and RSS verification suites
#[derive(Debug, Parser)]
#[command(name = "cfme-verify", version)]
struct Cli {
    /// TOML config file; CFME_* environment variables are used without one
    #[arg(long, env = "CFME_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SuiteArg::All)]
    suite: SuiteArg,

    /// Only run cases whose id contains this substring
    #[arg(long)]
    filter: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    let config = match HarnessConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let runner = match Runner::new(config, cli.filter) {
        Ok(runner) => runner,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let report = runner.run(cli.suite.into()).await;
    for case in report.cases.iter().filter(|c| c.cleanup.iter().any(|o| o.is_failed())) {
        tracing::warn!("{} left resources behind", case.id);
    }
    if report.teardown.iter().any(|o| o.is_failed()) {
        tracing::warn!("Suite teardown did not complete");
    }

    if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
