//! Runs the selected cases and reports on them.

use crate::cases::{self, CaseContext};
use crate::cli::RunArgs;
use crate::config::SuiteConfig;
use anyhow::{bail, Context, Result};
use edit_harness::ci::github_actions;
use edit_harness::{
    CiConfig, CombinationFile, FailurePolicy, Outcome, Overrides, TestLog, TestReporter,
    TimeoutRunner,
};
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to run a set of cases.
#[derive(Debug)]
pub struct RunPlan {
    cases: Vec<String>,
    overrides: Overrides,
    combinations: Option<CombinationFile>,
    ctx: CaseContext,
    timeout: Duration,
    report: Option<PathBuf>,
}

impl RunPlan {
    /// Resolve command-line arguments against the configuration.
    ///
    /// The command line wins over the config file, which wins over CI
    /// defaults.
    pub fn new(args: &RunArgs, config: &SuiteConfig, ci: &CiConfig) -> Result<Self> {
        let cases = if args.cases.is_empty() {
            cases::CASES.iter().map(|c| c.name.to_string()).collect()
        } else {
            args.cases.clone()
        };
        for name in &cases {
            if !cases::CASES.iter().any(|c| c.name == name.as_str()) {
                bail!("unknown test case '{}' (see `edit-suite list`)", name);
            }
        }

        let overrides = Overrides::parse_all(&args.dims)?;

        let timeout_secs = args.timeout.unwrap_or(config.run.timeout_secs);
        if timeout_secs == 0 {
            bail!("the per-case timeout must be at least one second");
        }

        let combinations = match args.combinations.as_ref().or(config.run.combinations.as_ref()) {
            Some(path) => Some(
                CombinationFile::load(path)
                    .with_context(|| format!("loading combinations from {}", path.display()))?,
            ),
            None => None,
        };

        let policy = args
            .failure_policy()
            .or(config.run.failure_policy)
            .or_else(|| ci.fail_fast.then_some(FailurePolicy::FailFast));

        let ctx = CaseContext {
            policy,
            artifacts: args.artifacts.clone().or_else(|| config.run.artifacts_dir.clone()),
            masters: args.masters.clone().or_else(|| config.run.masters_dir.clone()),
            criteria: config.comparison,
        };

        Ok(Self {
            cases,
            overrides,
            combinations,
            ctx,
            timeout: Duration::from_secs(timeout_secs),
            report: args.report.clone(),
        })
    }

    pub fn cases(&self) -> &[String] {
        &self.cases
    }

    /// Combination file values for `case`, then command-line values on top.
    pub fn overrides_for(&self, case: &str) -> Result<Overrides> {
        let mut overrides = match &self.combinations {
            Some(file) if file.block_for(case).is_some() => {
                Overrides::from_dimensions(&file.dimensions_for(case)?)
            }
            _ => Overrides::new(),
        };
        overrides.merge(&self.overrides);
        Ok(overrides)
    }

    /// Run every case in order, each under the time limit.
    pub async fn execute(&self, ci: &CiConfig) -> Result<TestReporter> {
        let runner = TimeoutRunner::new(self.timeout);
        let mut reporter = TestReporter::with_config(ci);

        for name in self.cases() {
            if ci.annotations {
                github_actions::group(name);
            }

            let overrides = self.overrides_for(name)?;
            let ctx = self.ctx.clone();
            let case = name.clone();
            let outcome = runner
                .run(name, move || run_one(&case, &ctx, &overrides))
                .await;

            tracing::info!(
                case = %outcome.case,
                status = %outcome.status,
                combinations = outcome.combinations_run,
                "outcome recorded"
            );
            println!("{}", outcome.summary());

            if ci.annotations {
                github_actions::annotate(&outcome);
                github_actions::endgroup();
            }
            reporter.record(outcome);
        }

        println!();
        println!("{}", reporter.summary());

        if let Some(path) = &self.report {
            reporter
                .write_json(path)
                .with_context(|| format!("writing report {}", path.display()))?;
        }
        Ok(reporter)
    }
}

/// Run a case, turning a setup error into a failed outcome.
fn run_one(name: &str, ctx: &CaseContext, overrides: &Overrides) -> Outcome {
    cases::run_named(name, ctx, overrides).unwrap_or_else(|e| {
        let mut log = TestLog::new(name);
        log.record_error(&e);
        log.finish()
    })
}
