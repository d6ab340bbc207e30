use colored::Colorize;

fn main() {
    if let Err(e) = lookout::app::run_cli() {
        eprintln!(":: {} {}", "error:".red(), e);
        std::process::exit(1);
    }
}
