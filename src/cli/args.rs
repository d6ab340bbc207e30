use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lookout",
    version,
    about = "multi-source record lookup console",
    long_about = "Lookout queries configured lookup services for mobile, aadhaar, gst, telegram, vehicle and ifsc records and renders the answers as text, csv, json or html reports.\n\nExamples:\n  lookout -t mobile -q 9044192030\n  lookout -t vehicle -b UP32AB1234 -b DL01CD5678 -o report.html\n  lookout -t mobile -i numbers.txt --rate 2 --format csv\n  lookout --history\n\nTip: Configure endpoints once in ~/.lookout/config.yml and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the report to FILE (format inferred from the extension)."
    )]
    pub output: Option<String>,

    #[arg(
        long = "fmt",
        visible_alias = "format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Report format: text, csv, json or html."
    )]
    pub format: Option<String>,

    #[arg(
        short = 't',
        long = "tp",
        visible_alias = "type",
        value_name = "TYPE",
        help_heading = "Lookup",
        help = "Record type: mobile, aadhaar, gst, tg, vehicle or ifsc."
    )]
    pub record_type: Option<String>,

    #[arg(
        short = 'q',
        long = "qr",
        visible_alias = "query",
        value_name = "ID",
        help_heading = "Input",
        help = "Identifier for a single lookup."
    )]
    pub query: Option<String>,

    #[arg(
        short = 'b',
        long = "bt",
        visible_alias = "batch",
        value_name = "ID",
        action = ArgAction::Append,
        help_heading = "Input",
        help = "Identifier for a batch run (repeatable)."
    )]
    pub batch: Vec<String>,

    #[arg(
        short = 'i',
        long = "if",
        visible_alias = "input-file",
        value_name = "FILE",
        help_heading = "Input",
        help = "Load batch identifiers from a file (one per line)."
    )]
    pub input_file: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.lookout/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "cd",
        visible_alias = "connect-delay-ms",
        value_name = "MS",
        help_heading = "Lookup",
        help = "Delay before a single lookup starts fetching, in milliseconds."
    )]
    pub connect_delay_ms: Option<u64>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "Performance",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "Performance",
        help = "Batch lookup rate limit (lookups per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "Performance",
        help = "HTTP proxy for lookup requests."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "sd",
        visible_alias = "state-dir",
        value_name = "DIR",
        help_heading = "State",
        help = "Directory holding search history and statistics."
    )]
    pub state_dir: Option<String>,

    #[arg(
        long = "hs",
        visible_alias = "history",
        help_heading = "State",
        help = "Show recent searches."
    )]
    pub history: bool,

    #[arg(
        long = "st",
        visible_alias = "stats",
        help_heading = "State",
        help = "Show search statistics."
    )]
    pub stats: bool,

    #[arg(
        long = "ch",
        visible_alias = "clear-history",
        help_heading = "State",
        help = "Delete the search history."
    )]
    pub clear_history: bool,
}
