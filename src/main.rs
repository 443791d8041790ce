//! mk CLI - run a command in an engine-managed container

use std::ffi::OsString;
use std::path::Path;
use std::process;
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{error, info};

use mk::cli::Args;
use mk::container::ENGINE_FLAG;
use mk::engine::EngineCommand;
use mk::{bootstrap_root, client, run_engine_command, Engine, EngineConfig, Op};

fn main() {
    let args = Args::parse_from(launcher_args());

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Command line, rewritten to `mk --engine <alias> ...` when the binary is
/// invoked through one of the `.docker/bin` aliases.
fn launcher_args() -> Vec<OsString> {
    let mut argv: Vec<OsString> = std::env::args_os().collect();
    let alias = argv
        .first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .and_then(|name| name.to_str())
        .and_then(EngineCommand::from_alias);
    match alias {
        Some(alias) => ["mk", ENGINE_FLAG, alias.name()]
            .map(OsString::from)
            .into_iter()
            .chain(argv.drain(1..))
            .collect(),
        None => argv,
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = EngineConfig::from_args(&args)?;
    config.log.init();

    if args.engine {
        return Ok(run_engine_command(&args.command, &args.args)?);
    }

    let c0 = bootstrap_root(&config.root, &config.program)
        .with_context(|| format!("failed to set up {}", config.root.display()))?;
    let engine = Arc::new(Engine::new(c0, config.log).with_self_exec(config.program.clone()));

    let (ready_tx, ready_rx) = mpsc::channel();
    let server = Arc::clone(&engine);
    thread::spawn(move || {
        match server.listen_and_serve(Some(ready_tx)) {
            Ok(()) => info!("Engine stopped"),
            Err(e) => error!("{}", e),
        }
        server.cleanup();
        process::exit(1);
    });
    if ready_rx.recv().is_err() {
        engine.cleanup();
        return Err(anyhow!("engine failed to start"));
    }

    let ops = [
        Op::new("in", [args.command.clone()]),
        Op::new("start", args.args.clone()),
        Op::new("wait", Vec::<String>::new()),
        Op::new("die", Vec::<String>::new()),
    ];
    let result = client::send(&engine.socket_path(), &ops);
    engine.cleanup();
    Ok(result?)
}
