// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use streamdag::config::{ConfigLoader, FileSecretStore, RuntimeBuilder};
use streamdag::engine::RunSummary;
use streamdag::tasks::TaskRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: streamdag -conf <pipeline.yaml> [-secrets <dir>]";

/// Command line arguments.
#[derive(Debug, Default, PartialEq)]
struct Args {
    conf: String,
    secrets: Option<String>,
}

impl Args {
    /// Accepts `-conf`/`--conf` and `-secrets`/`--secrets`, each followed by
    /// a value or joined to it with `=`.
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut conf = None;
        let mut secrets = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };
            let slot = match flag.trim_start_matches('-') {
                "conf" if flag.starts_with('-') => &mut conf,
                "secrets" if flag.starts_with('-') => &mut secrets,
                _ => return Err(format!("unexpected argument '{}'", arg)),
            };
            let value = match inline {
                Some(value) => value,
                None => args
                    .next()
                    .ok_or_else(|| format!("flag '{}' needs a value", flag))?,
            };
            *slot = Some(value);
        }

        let conf = conf.ok_or_else(|| "missing -conf".to_string())?;
        Ok(Self { conf, secrets })
    }
}

async fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let mut loader = ConfigLoader::new();
    if let Some(dir) = &args.secrets {
        loader = loader.with_secret_store(Arc::new(FileSecretStore::new(dir)));
    }

    let cfg = loader
        .load_file(&args.conf)
        .await
        .with_context(|| format!("loading {}", args.conf))?;
    let pipeline = RuntimeBuilder::from_config(&cfg, &TaskRegistry::with_builtins())
        .await
        .with_context(|| format!("building pipeline from {}", args.conf))?;
    Ok(pipeline.run().await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(reason) => {
            eprintln!("streamdag: {}", reason);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let started = Instant::now();
    match run(&args).await {
        Ok(summary) => {
            tracing::info!(
                tasks = summary.input_counts.len(),
                duration_ms = started.elapsed().as_millis() as u64,
                "pipeline finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("streamdag: {:#}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        Args::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_args() {
        struct TestCase {
            args: Vec<&'static str>,
            expected: Option<Args>,
        }

        let test_cases = vec![
            TestCase {
                args: vec!["-conf", "p.yaml"],
                expected: Some(Args {
                    conf: "p.yaml".into(),
                    secrets: None,
                }),
            },
            TestCase {
                args: vec!["--conf=p.yaml", "--secrets", "/run/secrets"],
                expected: Some(Args {
                    conf: "p.yaml".into(),
                    secrets: Some("/run/secrets".into()),
                }),
            },
            TestCase {
                args: vec![],
                expected: None,
            },
            TestCase {
                args: vec!["-conf"],
                expected: None,
            },
            TestCase {
                args: vec!["-secrets", "/s"],
                expected: None,
            },
            TestCase {
                args: vec!["p.yaml"],
                expected: None,
            },
        ];

        for tc in test_cases {
            assert_eq!(parse(&tc.args).ok(), tc.expected, "args: {:?}", tc.args);
        }
    }
}
