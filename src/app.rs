use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::batch::BatchOutcome;
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::history::{FileStore, HistoryLedger, Statistics};
use crate::output::{self, ExportSource, OutputFormat};
use crate::record::{RecordType, Verdict};
use crate::report::DEFAULT_DATA_SOURCE;
use crate::runner::{LookupStage, Options, Runner, RunnerError, DEFAULT_CONNECT_DELAY};
use crate::transport::{EndpointMap, HttpOptions, HttpTransport};
use crate::utils;

fn print_banner() {
    const BANNER: &str = r#"
    __                __              __
   / /   ____  ____  / /______  __  _/ /_
  / /   / __ \/ __ \/ //_/ __ \/ / / / __/
 / /___/ /_/ / /_/ / ,< / /_/ / /_/ / /_
/_____/\____/\____/_/|_|\____/\__,_/\__/
        multi-source record lookup console
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

/// Help headings in display order.
const HELP_SECTIONS: [&str; 6] = [
    "Input",
    "Lookup",
    "Output",
    "Performance",
    "State",
    "Options",
];

/// `-q, --query, --qr <ID>`: short flag, readable alias, compact long.
fn flag_usage(arg: &clap::Arg) -> String {
    let short = arg.get_short().map(|c| format!("-{c}"));
    let aliases = arg
        .get_visible_aliases()
        .unwrap_or_default()
        .into_iter()
        .map(|a| format!("--{a}"));
    let long = arg.get_long().map(|l| format!("--{l}"));
    let names = short.into_iter().chain(aliases).chain(long).join(", ");

    if !arg.get_action().takes_values() {
        return names;
    }
    let value = arg
        .get_value_names()
        .and_then(|v| v.first())
        .map_or("VALUE", |v| v.as_str());
    format!("{names} <{value}>")
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let title = match cmd.get_version() {
        Some(version) => format!("{} {version}", cmd.get_name()),
        None => cmd.get_name().to_string(),
    };
    let mut out = format!(
        "{title}\n{}\n",
        cmd.get_about().map(|a| a.to_string()).unwrap_or_default()
    );
    if let Some(long_about) = cmd.get_long_about() {
        out += &format!("\n{long_about}\n");
    }
    out += &format!("\nUsage: {} [OPTIONS]\n", cmd.get_name());

    let visible: Vec<&clap::Arg> = cmd.get_arguments().filter(|a| !a.is_hide_set()).collect();
    for section in HELP_SECTIONS {
        let rows = visible
            .iter()
            .filter(|a| a.get_help_heading().unwrap_or("Options") == section)
            .map(|arg| {
                let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
                format!("  {:<36} {}\n", flag_usage(arg), help.trim())
            })
            .collect::<String>();
        if !rows.is_empty() {
            out += &format!("\n{section}:\n{rows}");
        }
    }
    out
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Mode {
    Lookup {
        record_type: RecordType,
        query: String,
    },
    Batch {
        record_type: RecordType,
        inline: Vec<String>,
        input_file: Option<String>,
    },
    State {
        history: bool,
        stats: bool,
        clear: bool,
    },
}

#[derive(Clone, Debug)]
struct RunConfig {
    mode: Mode,
    endpoints: EndpointMap,
    state_dir: PathBuf,
    output: Option<String>,
    output_dir: Option<String>,
    format: Option<OutputFormat>,
    connect_delay: Duration,
    timeout: Option<Duration>,
    rate: Option<u32>,
    proxy: Option<String>,
    data_source: String,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let record_type = args.record_type.as_deref().and_then(RecordType::parse);

    let mode = if validation::is_state_command(&args) {
        Mode::State {
            history: args.history,
            stats: args.stats,
            clear: args.clear_history,
        }
    } else {
        let record_type = record_type.ok_or_else(|| "--type is required for lookups".to_string())?;
        match args.query {
            Some(query) => Mode::Lookup { record_type, query },
            None => Mode::Batch {
                record_type,
                inline: args.batch,
                input_file: args.input_file.map(|p| config::expand_tilde_string(&p)),
            },
        }
    };

    let state_dir = match args.state_dir.or(cfg.state_dir) {
        Some(dir) => config::expand_tilde(&dir),
        None => config::default_state_dir()
            .ok_or_else(|| "could not resolve a home directory for --state-dir".to_string())?,
    };

    let rate = args.rate.or(cfg.rate);
    if rate == Some(0) {
        return Err("invalid rate, expected positive integer".to_string());
    }
    let timeout = args.timeout.or(cfg.timeout).map(Duration::from_secs);
    let connect_delay = args
        .connect_delay_ms
        .or(cfg.connect_delay_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_CONNECT_DELAY);

    let output = args.output.map(|p| config::expand_tilde_string(&p));
    let format = match args.format.as_deref() {
        Some(raw) => Some(
            OutputFormat::parse(raw)
                .ok_or_else(|| format!("invalid --format '{raw}', expected text, csv, json or html"))?,
        ),
        None => output.as_deref().and_then(output::infer_format_from_path),
    };

    let data_source = cfg
        .data_source
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string());

    Ok(RunConfig {
        mode,
        endpoints: cfg.endpoints,
        state_dir,
        output,
        output_dir: cfg.output_dir.map(|p| config::expand_tilde_string(&p)),
        format,
        connect_delay,
        timeout,
        rate,
        proxy: args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty()),
        data_source,
        no_color,
    })
}

fn build_runner(run: &RunConfig) -> Result<Runner, String> {
    let transport = HttpTransport::new(
        run.endpoints.clone(),
        &HttpOptions {
            timeout: run.timeout,
            proxy: run.proxy.clone(),
        },
    )
    .map_err(|e| e.to_string())?;
    let store = FileStore::new(run.state_dir.clone());
    let options = Options {
        connect_delay: run.connect_delay,
        data_source: run.data_source.clone(),
        rate: run.rate,
        ..Options::default()
    };
    Runner::new(options, Arc::new(transport), Arc::new(store)).map_err(|e| e.to_string())
}

/// Writes the report when an output file or a format was requested.
async fn write_output(
    run: &RunConfig,
    source: &ExportSource<'_>,
) -> Result<Option<PathBuf>, String> {
    if run.output.is_none() && run.format.is_none() {
        return Ok(None);
    }
    let format = run.format.unwrap_or(OutputFormat::Text);
    let payload = output::build_export(source, format)?;
    let path = match run.output.as_ref() {
        Some(path) => PathBuf::from(path),
        None => run
            .output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(&payload.filename),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("failed to create output directory '{}': {e}", parent.display()))?;
    }
    tokio::fs::write(&path, &payload.bytes)
        .await
        .map_err(|e| format!("failed to write report '{}': {e}", path.display()))?;
    Ok(Some(path))
}

fn print_history(ledger: &HistoryLedger) {
    if ledger.is_empty() {
        println!(":: No recent searches");
        return;
    }
    for entry in ledger.entries() {
        let found = if entry.is_bulk {
            !entry.result.starts_with("Found: 0,")
        } else {
            entry.result == "Found"
        };
        let result = if found {
            entry.result.green()
        } else {
            entry.result.red()
        };
        println!(
            ":: {} :: {:<14} {:<20} :: {}",
            entry.timestamp, entry.kind, entry.value, result
        );
    }
}

fn print_statistics(stats: &Statistics) {
    format_kv_line("Searches", &stats.total.to_string());
    format_kv_line("Success", &format!("{}%", stats.success_rate()));
    format_kv_line("Avg Time", &format!("{}ms", stats.average_latency_ms()));
}

fn run_state(runner: &Runner, history: bool, stats: bool, clear: bool) -> Result<(), String> {
    if clear {
        runner.clear_history().map_err(|e| e.to_string())?;
        println!(":: {}", "Search history cleared".green());
    }
    if history {
        print_history(&runner.history().map_err(|e| e.to_string())?);
    }
    if stats {
        print_statistics(&runner.statistics().map_err(|e| e.to_string())?);
    }
    Ok(())
}

async fn run_lookup(
    run: &RunConfig,
    runner: &Runner,
    record_type: RecordType,
    query: &str,
) -> Result<(), String> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(200));
    spinner.set_style(
        ProgressStyle::with_template(":: {spinner} {msg}")
            .map_err(|e| format!("failed to build spinner style: {e}"))?,
    );

    let outcome = runner
        .lookup_with(record_type, query, |stage| match stage {
            LookupStage::Connecting => spinner.set_message("Connecting to database..."),
            LookupStage::Fetching => spinner.set_message("Fetching data..."),
            LookupStage::Done => spinner.finish_and_clear(),
        })
        .await;
    spinner.finish_and_clear();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(RunnerError::Validation(e)) => return Err(format!("invalid input: {e}")),
        Err(e) => return Err(e.to_string()),
    };

    println!("{}", outcome.report);
    let verdict = match outcome.result.verdict {
        Verdict::Found => "Found".green(),
        Verdict::NotFound => "Not Found".red(),
        Verdict::Malformed => "Invalid Response".red(),
        Verdict::TransportError => "Network Error".red(),
    };
    format_kv_line("Result", &verdict.to_string());
    format_kv_line("Time", &format!("{}ms", outcome.latency.as_millis()));

    let source = ExportSource {
        kind: record_type.key(),
        report: &outcome.report,
        batch: None,
    };
    if let Some(path) = write_output(run, &source).await? {
        format_kv_line("Saved", &path.display().to_string());
    }
    Ok(())
}

async fn collect_batch_identifiers(
    record_type: RecordType,
    inline: &[String],
    input_file: Option<&str>,
) -> Result<Vec<String>, String> {
    let mut identifiers = utils::parse_batch_identifiers(record_type, &inline.join("\n"));
    if let Some(path) = input_file {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("failed to read input file '{path}': {e}"))?;
        identifiers.extend(utils::parse_batch_identifiers(record_type, &contents));
    }
    Ok(identifiers)
}

fn print_batch_summary(outcome: &BatchOutcome) {
    let summary = &outcome.summary;
    format_kv_line("Total", &summary.total.to_string());
    format_kv_line("Found", &summary.found.len().to_string().green().to_string());
    format_kv_line(
        "Not Found",
        &summary.not_found.len().to_string().red().to_string(),
    );
    format_kv_line("Success", &summary.success_rate_label());
}

async fn run_batch(
    run: &RunConfig,
    runner: &mut Runner,
    record_type: RecordType,
    inline: &[String],
    input_file: Option<&str>,
) -> Result<(), String> {
    let identifiers = collect_batch_identifiers(record_type, inline, input_file).await?;
    if identifiers.is_empty() {
        return Err("no identifiers found in batch input".to_string());
    }

    let pb = ProgressBar::new(identifiers.len() as u64);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Progress: [{pos}/{len}] :: {percent}% :: Elapsed: {prefix} :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );
    runner.set_progress_sink(Arc::new(pb.clone()));

    let outcome = runner
        .run_batch(&identifiers, record_type)
        .await
        .map_err(|e| e.to_string())?;
    pb.finish_and_clear();

    println!();
    print_batch_summary(&outcome);

    let kind = format!("bulk-{}", record_type.key());
    let source = ExportSource {
        kind: &kind,
        report: &outcome.report,
        batch: Some(&outcome.summary),
    };
    if let Some(path) = write_output(run, &source).await? {
        format_kv_line("Saved", &path.display().to_string());
    }

    println!();
    println!(
        ":: Completed :: batch took {}s ::",
        outcome.summary.elapsed.as_secs()
    );
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let mut runner = build_runner(&run)?;
    debug!(state_dir = %run.state_dir.display(), "runner ready");

    match run.mode.clone() {
        Mode::State {
            history,
            stats,
            clear,
        } => run_state(&runner, history, stats, clear),
        Mode::Lookup { record_type, query } => {
            format_kv_line("Type", record_type.key());
            format_kv_line("Query", &query);
            format_kv_line("Source", &run.data_source);
            println!();
            run_lookup(&run, &runner, record_type, &query).await
        }
        Mode::Batch {
            record_type,
            inline,
            input_file,
        } => {
            format_kv_line("Type", record_type.key());
            format_kv_line("Source", &run.data_source);
            if let Some(rate) = run.rate {
                format_kv_line("Rate", &format!("{rate}/s"));
            }
            println!();
            run_batch(&run, &mut runner, record_type, &inline, input_file.as_deref()).await
        }
    }
}

fn resolve_config(args: &CliArgs) -> Result<ConfigFile, String> {
    if let Some(path) = args.config.as_deref() {
        return config::load_config(&config::expand_tilde(path), false);
    }
    let Some(path) = config::default_config_path() else {
        return Ok(ConfigFile::default());
    };
    if let Err(e) = config::ensure_default_config_file(&path) {
        warn!("{e}");
    }
    config::load_config(&path, true)
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_tracing(args.verbose);
    let cfg = resolve_config(&args)?;
    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use crate::transport::Endpoint;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn args(argv: &[&str]) -> CliArgs {
        let mut full = vec!["lookout"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    #[test]
    fn single_lookup_uses_config_defaults() {
        let cfg = ConfigFile {
            state_dir: Some("/tmp/lookout-state".to_string()),
            ..ConfigFile::default()
        };
        let run = build_run_config(args(&["-t", "mobile", "-q", "9044192030"]), cfg).unwrap();
        assert_eq!(
            run.mode,
            Mode::Lookup {
                record_type: RecordType::Mobile,
                query: "9044192030".to_string()
            }
        );
        assert_eq!(run.connect_delay, DEFAULT_CONNECT_DELAY);
        assert_eq!(run.data_source, DEFAULT_DATA_SOURCE);
        assert_eq!(run.state_dir, PathBuf::from("/tmp/lookout-state"));
        assert_eq!(run.format, None);
    }

    #[test]
    fn flags_override_config() {
        let mut endpoints = EndpointMap::new();
        endpoints.insert(
            RecordType::Vehicle,
            Endpoint {
                url: "https://lookup.example/vehicle".to_string(),
                param: None,
            },
        );
        let cfg = ConfigFile {
            endpoints,
            state_dir: Some("/tmp/a".to_string()),
            rate: Some(10),
            connect_delay_ms: Some(500),
            data_source: Some("Field Office".to_string()),
            ..ConfigFile::default()
        };
        let run = build_run_config(
            args(&[
                "-t",
                "vehicle",
                "-b",
                "UP32AB1234",
                "--rate",
                "2",
                "--state-dir",
                "/tmp/b",
                "-o",
                "out/report.html",
            ]),
            cfg,
        )
        .unwrap();
        assert_eq!(run.rate, Some(2));
        assert_eq!(run.connect_delay, Duration::from_millis(500));
        assert_eq!(run.state_dir, PathBuf::from("/tmp/b"));
        assert_eq!(run.format, Some(OutputFormat::Html));
        assert_eq!(run.data_source, "Field Office");
        assert_eq!(run.endpoints.len(), 1);
    }

    #[test]
    fn state_commands_need_no_type() {
        let cfg = ConfigFile {
            state_dir: Some("/tmp/s".to_string()),
            ..ConfigFile::default()
        };
        let run = build_run_config(args(&["--history", "--stats"]), cfg).unwrap();
        assert_eq!(
            run.mode,
            Mode::State {
                history: true,
                stats: true,
                clear: false
            }
        );
    }

    #[test]
    fn config_rate_of_zero_is_rejected() {
        let cfg = ConfigFile {
            state_dir: Some("/tmp/s".to_string()),
            rate: Some(0),
            ..ConfigFile::default()
        };
        let err = build_run_config(args(&["-t", "mobile", "-b", "9044192030"]), cfg).unwrap_err();
        assert!(err.contains("invalid rate"));
    }

    #[test]
    fn help_lists_every_heading() {
        let help = render_custom_help();
        for heading in ["Input:", "Lookup:", "Output:", "Performance:", "State:"] {
            assert!(help.contains(heading), "{heading}");
        }
        assert!(help.contains("--clear-history"));
    }

    #[test]
    fn flag_usage_lists_short_alias_long_and_value() {
        let cmd = CliArgs::command();
        let usage = |id: &str| {
            let arg = cmd.get_arguments().find(|a| a.get_id().as_str() == id).unwrap();
            flag_usage(arg)
        };
        assert_eq!(usage("query"), "-q, --query, --qr <ID>");
        assert_eq!(usage("no_color"), "--no-color, --nc");
        assert_eq!(usage("verbose"), "-v, --verbose, --vb");
    }

    #[tokio::test]
    async fn batch_identifiers_merge_inline_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        std::fs::write(&path, "9044192031\n\n 9044192032 \n").unwrap();
        let ids = collect_batch_identifiers(
            RecordType::Mobile,
            &["9044192030".to_string()],
            path.to_str(),
        )
        .await
        .unwrap();
        assert_eq!(ids, vec!["9044192030", "9044192031", "9044192032"]);
    }

    #[tokio::test]
    async fn output_lands_in_output_dir_when_only_format_given() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ConfigFile {
            state_dir: Some("/tmp/s".to_string()),
            output_dir: dir.path().to_str().map(str::to_string),
            ..ConfigFile::default()
        };
        let run = build_run_config(
            args(&["-t", "mobile", "-q", "9044192030", "--format", "csv"]),
            cfg,
        )
        .unwrap();
        let source = ExportSource {
            kind: "mobile",
            report: "Data not found for 9044192030\n",
            batch: None,
        };
        let path = write_output(&run, &source).await.unwrap().unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
        assert!(path.exists());
    }
}
