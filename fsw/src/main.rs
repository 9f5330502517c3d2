// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use obdh::DataStore;
use sched::Scheduler;
use sched::time::Clock;
use tracing_subscriber::EnvFilter;

use fsw::config::{self, flight_config};
use fsw::state::StateManager;
use fsw::tasks::flight_registry;

#[derive(Parser)]
#[command(name = "fsw", about = "CubeSat flight software core")]
struct Args {
    /// Mass storage mount point
    #[arg(long, env = "FSW_DATA_ROOT", default_value = "/sd")]
    data_root: PathBuf,

    /// Mode to boot into
    #[arg(long, default_value = config::STARTUP)]
    mode: String,

    /// Log filter, tracing `EnvFilter` syntax
    #[arg(long, env = "FSW_LOG", default_value = "info")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log)?)
        .init();

    let clock = Clock::monotonic();
    let scheduler = Rc::new(Scheduler::new(clock.clone()));
    let store = Rc::new(RefCell::new(DataStore::new(args.data_root, clock)?));

    // The UART to the payload co-processor is wired by the HAL, which is
    // not part of the core; on the ground the downlink task simply idles.
    let state = StateManager::new(scheduler, store, flight_config(), flight_registry(None));

    tracing::info!(mode = %args.mode, "starting flight software");
    state.start(&args.mode)?;
    Ok(())
}
