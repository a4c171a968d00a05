#![warn(clippy::pedantic)]

mod actions;
mod api;
mod blum;
mod cli;
mod fileio;
mod menu;
mod scheduler;
mod session;
mod tasks;
#[cfg(test)]
mod testing;

use anyhow::{bail, Context, Result};
use fileio::TokenStore;
use scheduler::Scheduler;
use session::{Pacing, Session, ThreadSleeper};
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cli::Args::parse_args();
    let seeds = fileio::read_seed_file(&args.seeds)
        .with_context(|| "Error loading account query ids")?;
    if seeds.is_empty() {
        bail!(
            "No query ids found. Please ensure {} is populated",
            args.seeds.display()
        );
    }

    let blum = blum::Blum::new(Duration::from_secs(args.timeout_secs))
        .with_context(|| "Error creating the HTTP client")?;
    let sleeper = ThreadSleeper;
    let pacing = Pacing {
        between_calls: Duration::from_millis(args.pacing_ms),
        ..Pacing::default()
    };
    let mut session = Session::new(
        &blum,
        &sleeper,
        pacing,
        TokenStore::new(&args.bearers),
        seeds,
    );

    menu::print_banner();
    log::info!("Generating bearer tokens, please wait");
    if args.fresh {
        session.acquire_all();
    } else {
        session.load_or_initialize();
    }
    session.rebuild_snapshots();

    if args.unattended {
        println!("{}", menu::render_table(session.accounts()));
        let mut scheduler = Scheduler::new(&mut session);
        scheduler.run_forever(|session, _| {
            println!("{}", menu::render_table(session.accounts()));
        });
    }

    menu::run_interactive(&mut session)
}
