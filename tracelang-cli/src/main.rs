use std::process;

use tracelang_cli::{init_logging, run, Config, RunResult};

fn main() {
    let config = Config::new();
    init_logging(config.verbosity);
    if run(config) != RunResult::Ok {
        process::exit(1);
    }
}
