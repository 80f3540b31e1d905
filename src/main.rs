use std::{path::PathBuf, process::ExitCode, str::FromStr};

use painstats::{Config, Error, Report};
use tracing::{error, Level};

const LOG_ENV: &str = "PAINSTATS_LOG";

fn usage() -> ExitCode {
    let reports = Report::ALL.map(|r| r.name()).join("|");
    eprintln!("usage: painstats <{}> [config.json]", reports);
    eprintln!("The config path may also be given in {}.", painstats::CONFIG_ENV);
    ExitCode::from(2)
}

fn run(report: Report, config: Option<PathBuf>) -> Result<(), Error> {
    let config = Config::resolve(config.as_deref())?;
    report.run(&config, &mut std::io::stdout().lock())?;
    Ok(())
}

fn main() -> ExitCode {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|x| Level::from_str(&x).ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(report) = args.next() else {
        return usage();
    };
    let report = match report.parse::<Report>() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e);
            return usage();
        },
    };
    match run(report, args.next().map(PathBuf::from)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} report failed: {}", report, e);
            match e {
                Error::InputNotFound(_) => eprintln!("Error: {}", e),
                e if e.is_load_error() => eprintln!("An unexpected error occurred: {}", e),
                e => eprintln!("Error: {}", e),
            }
            ExitCode::FAILURE
        },
    }
}
