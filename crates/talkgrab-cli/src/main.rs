use talkgrab_core::logging;

mod cli;

fn main() {
    // Initialize logging as early as possible; fall back to stderr when
    // the state dir is unusable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli::run_from_args() {
        eprintln!("talkgrab error: {:#}", err);
        std::process::exit(1);
    }
}
