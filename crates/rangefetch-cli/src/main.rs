use rangefetch::logging;

mod cli;

#[tokio::main]
async fn main() {
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli::run_from_args().await {
        eprintln!("rangefetch error: {:#}", err);
        std::process::exit(1);
    }
}
