// src/main.rs

use asyncproc::{cli, load_config, logging, run};

fn main() {
    if let Err(err) = run_main() {
        eprintln!("asyncproc error: {err:?}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let cfg = load_config(&args)?;
    logging::init_logging(args.log_level, cfg.logging.level.as_deref())?;
    run(args, cfg)
}
