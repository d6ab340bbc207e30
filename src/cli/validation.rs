use crate::cli::args::CliArgs;
use crate::output::OutputFormat;
use crate::record::RecordType;

/// `true` when the invocation only manages saved state.
pub fn is_state_command(args: &CliArgs) -> bool {
    args.history || args.stats || args.clear_history
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.record_type.as_deref() {
        if RecordType::parse(raw).is_none() {
            return Err(format!(
                "invalid --type '{raw}', expected mobile, aadhaar, gst, tg, vehicle or ifsc"
            ));
        }
    }
    if let Some(raw) = args.format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --format '{raw}', expected text, csv, json or html"
            ));
        }
    }
    if let Some(rate) = args.rate {
        if rate == 0 {
            return Err("invalid rate, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }

    let batch_input = !args.batch.is_empty() || args.input_file.is_some();
    if args.query.is_some() && batch_input {
        return Err("--query cannot be combined with --batch or --input-file".to_string());
    }
    if is_state_command(args) {
        if args.query.is_some() || batch_input {
            return Err(
                "--history, --stats and --clear-history cannot be combined with a lookup"
                    .to_string(),
            );
        }
        return Ok(());
    }
    if args.query.is_none() && !batch_input {
        return Err(
            "at least one input mode must be specified (--query, --batch, or --input-file)"
                .to_string(),
        );
    }
    if args.record_type.is_none() {
        return Err("--type is required for lookups".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    fn parse(argv: &[&str]) -> CliArgs {
        let mut full = vec!["lookout"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    #[rstest]
    #[case(&["-t", "mobile", "-q", "9044192030"])]
    #[case(&["-t", "vehicle", "-b", "UP32AB1234", "-b", "DL01CD5678"])]
    #[case(&["-t", "gst", "-i", "ids.txt", "--format", "csv"])]
    #[case(&["--history"])]
    #[case(&["--stats", "--clear-history"])]
    fn accepts(#[case] argv: &[&str]) {
        assert!(validate(&parse(argv)).is_ok());
    }

    #[rstest]
    #[case(&["-q", "9044192030"], "--type is required")]
    #[case(&["-t", "passport", "-q", "x"], "invalid --type")]
    #[case(&["-t", "mobile"], "at least one input mode")]
    #[case(&["-t", "mobile", "-q", "1", "-b", "2"], "cannot be combined with --batch")]
    #[case(&["--history", "-t", "mobile", "-q", "1"], "cannot be combined with a lookup")]
    #[case(&["-t", "mobile", "-q", "1", "--format", "pdf"], "invalid --format")]
    #[case(&["-t", "mobile", "-b", "1", "--rate", "0"], "invalid rate")]
    fn rejects(#[case] argv: &[&str], #[case] message: &str) {
        let err = validate(&parse(argv)).unwrap_err();
        assert!(err.contains(message), "{err}");
    }
}
