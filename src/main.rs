use clap::Parser;
use ibs_th1_listener::app::{Options, RunError, run_with_io};
use ibs_th1_listener::scanner::bluer::BluerScanner;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

/// Connect to the default Bluetooth adapter and stream readings to stdout
/// until interrupted.
async fn run(options: Options) -> Result<(), RunError> {
    let scanner = Arc::new(BluerScanner::new().await?);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    run_with_io(options, scanner, shutdown, &mut out, &mut err).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd, Telegraf execd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();

    match run(options).await {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            eprintln!("error: {}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
