use clap::Parser;
use dotenvy::dotenv;

use feedloop::commands::{AppState, Command, Commands};
use feedloop::config::Config;
use feedloop::errors::AppResult;

/// A command-line RSS aggregator: register, follow feeds, and poll them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Command to run: login, register, addfeed, feeds, follow, unfollow,
    /// following, browse, agg, users, reset
    command: String,
    /// Arguments for the command
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> AppResult<()> {
    let config = Config::load()?;
    let pool = feedloop::initialize_db_pool(&config.db_url)?;
    {
        let mut conn = pool.get()?;
        feedloop::run_migrations(&mut conn)?;
    }

    let commands = Commands::default_set()?;
    let mut state = AppState { config, pool };
    commands.run(
        &mut state,
        &Command {
            name: args.command.to_lowercase(),
            args: args.args,
        },
    )
}
