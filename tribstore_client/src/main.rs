//! Tribstore command-line Tribbler client.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::runtime::Builder;
use tribstore::{
    logger_init, new_bin_client, pf_debug, pf_error, BinStorage, Front,
    FrontConfig, Server, Storage, Trib, TribError, ME,
};

/// Command line arguments definition.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Comma-separated addresses of all backends, in the same order given
    /// to keepers.
    #[arg(short, long, value_delimiter = ',', required = true)]
    backs: Vec<String>,

    /// Front-end limits in TOML format.
    #[arg(long)]
    config: Option<String>,

    /// Number of tokio worker threads.
    #[arg(long, default_value_t = 2)]
    threads: usize,

    /// Operation to run.
    #[command(subcommand)]
    command: Command,
}

/// Front-end operations.
#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Register a new user.
    SignUp { user: String },

    /// List registered users.
    ListUsers,

    /// Post a trib.
    Post {
        who: String,
        message: String,
        #[arg(default_value_t = 0)]
        clock: u64,
    },

    /// List a user's tribs.
    Tribs { user: String },

    /// Follow a user.
    Follow { who: String, whom: String },

    /// Stop following a user.
    Unfollow { who: String, whom: String },

    /// Check whether one user follows another.
    IsFollowing { who: String, whom: String },

    /// List the users someone follows.
    Following { who: String },

    /// Show a user's home timeline.
    Home { user: String },

    /// Advance the logical clock of a bin's backend.
    Clock {
        bin: String,
        #[arg(default_value_t = 0)]
        at_least: u64,
    },
}

impl CliArgs {
    /// Sanitize command line arguments, return `Ok(config)` on success or
    /// `Err(TribError)` on any error.
    fn sanitize(&self) -> Result<FrontConfig, TribError> {
        if let Some(i) = self.backs.iter().position(|b| b.is_empty()) {
            return Err(TribError::Config(format!(
                "empty backend address at index {}",
                i
            )));
        }
        if self.threads < 1 {
            return Err(TribError::Config(format!(
                "invalid number of threads {}",
                self.threads
            )));
        }
        FrontConfig::from_toml(self.config.as_deref())
    }
}

fn format_trib(trib: &Trib) -> String {
    format!("[{}] {}: {}", trib.clock, trib.user, trib.message)
}

/// Runs one operation against `front`, returning the lines to print.
async fn run_command(
    front: &dyn Server,
    bins: &dyn BinStorage,
    command: &Command,
) -> Result<Vec<String>, TribError> {
    pf_debug!("running {:?}", command);
    match command {
        Command::SignUp { user } => {
            front.sign_up(user).await?;
            Ok(vec![])
        }
        Command::ListUsers => front.list_users().await,
        Command::Post {
            who,
            message,
            clock,
        } => {
            front.post(who, message, *clock).await?;
            Ok(vec![])
        }
        Command::Tribs { user } => {
            Ok(front.tribs(user).await?.iter().map(format_trib).collect())
        }
        Command::Follow { who, whom } => {
            front.follow(who, whom).await?;
            Ok(vec![])
        }
        Command::Unfollow { who, whom } => {
            front.unfollow(who, whom).await?;
            Ok(vec![])
        }
        Command::IsFollowing { who, whom } => {
            Ok(vec![front.is_following(who, whom).await?.to_string()])
        }
        Command::Following { who } => front.following(who).await,
        Command::Home { user } => {
            Ok(front.home(user).await?.iter().map(format_trib).collect())
        }
        Command::Clock { bin, at_least } => {
            let clock = bins.bin(bin).await?.clock(*at_least).await?;
            Ok(vec![clock.to_string()])
        }
    }
}

/// Actual main function of the Tribstore client.
fn client_main() -> Result<(), TribError> {
    // read in and parse command line arguments
    let args = CliArgs::parse();
    let config = args.sanitize()?;
    let _ = ME.set("c".into());

    // create tokio multi-threaded runtime
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .worker_threads(args.threads)
        .thread_name("tokio-worker-client")
        .build()?;

    let lines = runtime.block_on(async move {
        let bins = new_bin_client(args.backs.clone());
        let front = Front::new(bins.clone(), config);
        run_command(&front, bins.as_ref(), &args.command).await
    })?;

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Main function of the Tribstore client.
fn main() -> ExitCode {
    logger_init();

    if let Err(ref e) = client_main() {
        pf_error!("client_main exited: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
