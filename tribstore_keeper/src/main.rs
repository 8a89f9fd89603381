//! Tribstore keeper executable.

use std::collections::HashSet;
use std::process::ExitCode;

use clap::Parser;
use log::{self, LevelFilter};
use tokio::runtime::Builder;
use tokio::sync::{mpsc, watch};
use tribstore::{
    logger_init, pf_error, pf_info, serve_keeper, KeeperConfig, TribError, ME,
};

/// Command line arguments definition.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Comma-separated addresses of all keepers (e.g., '-a h1:p1,h2:p2').
    #[arg(short, long, value_delimiter = ',', required = true)]
    addrs: Vec<String>,

    /// Comma-separated addresses of all backends, in the same order given
    /// to clients.
    #[arg(short, long, value_delimiter = ',', required = true)]
    backs: Vec<String>,

    /// Index of this keeper in the keeper address list.
    #[arg(short, long, default_value_t = 0)]
    this: usize,

    /// Ordinal reported to clients; defaults to the keeper index.
    #[arg(short, long)]
    id: Option<u64>,

    /// Number of tokio worker threads.
    #[arg(long, default_value_t = 4)]
    threads: usize,
}

impl CliArgs {
    /// Sanitize command line arguments, return `Ok(config)` on success or
    /// `Err(TribError)` on any error.
    fn sanitize(&self) -> Result<KeeperConfig, TribError> {
        let mut back_set = HashSet::new();
        for back in self.backs.iter() {
            if !back_set.insert(back) {
                return Err(TribError::Config(format!(
                    "duplicate backend address {} given",
                    back
                )));
            }
        }
        if self.threads < 2 {
            return Err(TribError::Config(format!(
                "invalid number of threads {}",
                self.threads
            )));
        }

        let kc = KeeperConfig {
            addrs: self.addrs.clone(),
            backs: self.backs.clone(),
            this: self.this,
            id: self.id.unwrap_or(self.this as u64),
            ..Default::default()
        };
        kc.validate()?;
        Ok(kc)
    }
}

/// Actual main function of a Tribstore keeper.
fn keeper_main() -> Result<(), TribError> {
    // read in and parse command line arguments
    let args = CliArgs::parse();
    let mut kc = args.sanitize()?;
    let _ = ME.set(format!("k{}", kc.id));

    // set up termination signals handler
    let (tx_term, mut rx_term) = watch::channel(false);
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
            .thread_name("tokio-worker-keeper")
            .build()?;

        // enter tokio runtime, start the keeper, then idle until terminated
        runtime.block_on(async move {
            let (tx_ready, mut rx_ready) = mpsc::channel(1);
            kc.ready = Some(tx_ready);
            kc.shutdown = Some(rx_term.clone());
            serve_keeper(kc).await?;
            if rx_ready.recv().await == Some(true) {
                pf_info!("keeper ready");
            }

            while !*rx_term.borrow_and_update() {
                if rx_term.changed().await.is_err() {
                    break;
                }
            }
            pf_info!("keeper terminated");

            // suppress logging before dropping the runtime to avoid spurious
            // error messages
            log::set_max_level(LevelFilter::Off);

            Ok::<(), TribError>(()) // give type hint for this async closure
        })?;
    } // drop the runtime here

    log::set_max_level(log_level);
    Ok(())
}

/// Main function of a Tribstore keeper.
fn main() -> ExitCode {
    logger_init();

    if let Err(ref e) = keeper_main() {
        pf_error!("keeper_main exited: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
