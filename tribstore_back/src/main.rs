//! Tribstore backend storage node executable.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{self, LevelFilter};
use tokio::runtime::Builder;
use tokio::sync::{mpsc, watch};
use tribstore::{
    logger_init, pf_error, pf_info, serve_back, BackConfig, MemStorage,
    TribError, ME,
};

/// Command line arguments definition.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Address to serve the storage RPC on, in `host:port` form.
    #[arg(short, long)]
    bind_addr: String,

    /// Number of tokio worker threads.
    #[arg(long, default_value_t = 8)]
    threads: usize,
}

impl CliArgs {
    /// Sanitize command line arguments, return `Ok(bind_addr)` on success
    /// or `Err(TribError)` on any error.
    fn sanitize(&self) -> Result<SocketAddr, TribError> {
        let addr: SocketAddr = self.bind_addr.parse().map_err(|e| {
            TribError::Config(format!(
                "failed to parse bind_addr '{}': {}",
                self.bind_addr, e
            ))
        })?;
        if addr.port() <= 1024 {
            Err(TribError::Config(format!("invalid port {}", addr.port())))
        } else if self.threads < 2 {
            Err(TribError::Config(format!(
                "invalid number of threads {}",
                self.threads
            )))
        } else {
            Ok(addr)
        }
    }
}

/// Actual main function of a Tribstore backend.
fn back_main() -> Result<(), TribError> {
    // read in and parse command line arguments
    let args = CliArgs::parse();
    let addr = args.sanitize()?;
    let _ = ME.set(format!("b:{}", addr));

    // set up termination signals handler
    let (tx_term, rx_term) = watch::channel(false);
    ctrlc::set_handler(move || {
        if let Err(e) = tx_term.send(true) {
            pf_error!("error sending to term channel: {}", e);
        }
    })?;

    let log_level = log::max_level();
    {
        // create tokio multi-threaded runtime
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .worker_threads(args.threads)
            .thread_name("tokio-worker-back")
            .build()?;

        // enter tokio runtime and serve until terminated
        runtime.block_on(async move {
            let (tx_ready, mut rx_ready) = mpsc::channel(1);
            let server = tokio::spawn(serve_back(BackConfig {
                addr: addr.to_string(),
                store: Arc::new(MemStorage::new()),
                ready: Some(tx_ready),
                shutdown: Some(rx_term),
            }));
            if rx_ready.recv().await == Some(true) {
                pf_info!("backend ready");
            }

            server.await.map_err(TribError::msg)??;

            // suppress logging before dropping the runtime to avoid spurious
            // error messages
            log::set_max_level(LevelFilter::Off);

            Ok::<(), TribError>(()) // give type hint for this async closure
        })?;
    } // drop the runtime here

    log::set_max_level(log_level);
    Ok(())
}

/// Main function of a Tribstore backend.
fn main() -> ExitCode {
    logger_init();

    if let Err(ref e) = back_main() {
        pf_error!("back_main exited: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
