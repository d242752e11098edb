//! tsmend CLI binary entry point.
//! Resolves configuration, delegates to the library, and prints reports.

use clap::Parser;
use std::process::exit;
use tracing_subscriber::EnvFilter;
use tsmend::cli::{Cli, Commands};
use tsmend::config::{self, CliOverrides, Effective};
use tsmend::diagnostics::summarize;
use tsmend::fix::Engine;
use tsmend::models::VerifyStatus;
use tsmend::output::{self, RunReport};
use tsmend::utils::{error_prefix, info_prefix, note_prefix};
use tsmend::verify::verify_run;

fn flag(b: bool) -> Option<bool> {
    if b {
        Some(true)
    } else {
        None
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", error_prefix(), msg);
    exit(2);
}

fn note_missing_config(eff: &Effective) {
    if !eff.config_found && eff.output != "json" {
        eprintln!("{} No tsmend.toml found; using defaults.", note_prefix());
    }
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Run {
            path,
            dry_run,
            verbose,
            verify,
            strict,
            include,
            steps,
            jobs,
            diff,
            output,
            catalog,
        } => {
            let eff = config::resolve_effective(&CliOverrides {
                path,
                include,
                dry_run: flag(dry_run),
                verbose: flag(verbose),
                verify: flag(verify),
                strict: flag(strict),
                diff: flag(diff),
                steps,
                jobs,
                output,
                catalog,
            })
            .unwrap_or_else(|e| fail(e));
            init_logging(eff.verbose);
            note_missing_config(&eff);

            let catalog = eff.load_catalog().unwrap_or_else(|e| fail(e));
            let source = eff.diagnostic_source().unwrap_or_else(|e| fail(e));
            let run_cfg = eff.run_config();
            let selected = catalog
                .steps_by_priority(run_cfg.selected_steps.as_deref())
                .unwrap_or_else(|e| fail(e));
            if eff.dry_run && eff.output != "json" {
                eprintln!("{} Dry run: no files will be written.", info_prefix());
            }

            let outcome = Engine::new(&catalog)
                .with_source(&source)
                .run(&run_cfg)
                .unwrap_or_else(|e| fail(e));
            let verification = if eff.verify {
                Some(verify_run(Some(&source), outcome.baseline, eff.dry_run))
            } else {
                None
            };
            output::print_run(
                &RunReport {
                    config: &run_cfg,
                    steps: &selected,
                    stats: &outcome.stats,
                    verification: verification.as_ref(),
                },
                &eff.output,
            );

            if eff.strict && eff.verify {
                let clean = matches!(
                    &verification,
                    Some(VerifyStatus::Done(v)) if v.success && v.new_count == 0
                );
                if !clean {
                    exit(1);
                }
            }
        }
        Commands::Steps {
            path,
            catalog,
            output,
        } => {
            let eff = config::resolve_effective(&CliOverrides {
                path,
                catalog,
                output,
                ..Default::default()
            })
            .unwrap_or_else(|e| fail(e));
            init_logging(false);
            let catalog = eff.load_catalog().unwrap_or_else(|e| fail(e));
            output::print_steps(&catalog, &eff.output);
        }
        Commands::Check {
            path,
            verbose,
            output,
        } => {
            let eff = config::resolve_effective(&CliOverrides {
                path,
                verbose: flag(verbose),
                output,
                ..Default::default()
            })
            .unwrap_or_else(|e| fail(e));
            init_logging(eff.verbose);
            note_missing_config(&eff);
            let source = eff.diagnostic_source().unwrap_or_else(|e| fail(e));
            let diagnostics = source.collect().unwrap_or_else(|e| fail(e));
            let summary = summarize(&diagnostics);
            output::print_check(&diagnostics, &summary, &eff.output, eff.verbose);
        }
    }
}
