//! Root container (c0) setup
//!
//! The root container is the directory the engine was started in. Its
//! `.docker` tree holds the engine state and the launcher aliases used to
//! re-invoke the engine binary.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::Path;

use tracing::{debug, info, warn};

use super::types::{Container, ROOT_CONTAINER_ID};
use crate::error::Result;
use crate::util::{generate_id, write_file};
use crate::util::fs::create_dir_all;

/// Name of the launcher installed in `.docker/bin`.
pub const LAUNCHER: &str = "docker";

/// Aliases of the launcher, dispatched on the name the binary is invoked as.
pub const LAUNCHER_ALIASES: [&str; 4] = ["exec", "start", "stop", "commit"];

/// Flag that puts the binary in internal engine mode.
pub const ENGINE_FLAG: &str = "--engine";

/// Open the root container at `root`, setting up `.docker` on first use.
///
/// An existing `.docker` directory is left untouched. If first-time setup
/// fails, the partially created tree is removed.
pub fn bootstrap_root(root: &Path, program: &Path) -> Result<Container> {
    let abspath = std::path::absolute(root)?;
    let c0 = Container::new(ROOT_CONTAINER_ID, abspath);

    let state = c0.path([".docker"]);
    if state.is_dir() {
        debug!("Reusing existing state at {}", state.display());
        return Ok(c0);
    }

    create_dir_all(&state)?;
    if let Err(e) = setup(&c0, program) {
        if let Err(cleanup) = fs::remove_dir_all(&state) {
            warn!("Failed to remove {}: {}", state.display(), cleanup);
        }
        return Err(e);
    }
    info!("Initialized engine state at {}", state.display());
    Ok(c0)
}

fn setup(c0: &Container, program: &Path) -> Result<()> {
    write_file(&c0.path([".docker/engine/id"]), &format!("{}\n", generate_id()?))?;

    create_dir_all(&c0.path([".docker/bin"]))?;
    install_launcher(program, &c0.path([".docker/bin", LAUNCHER]))?;
    for alias in LAUNCHER_ALIASES {
        symlink(LAUNCHER, c0.path([".docker/bin", alias]))?;
    }

    write_file(
        &c0.path([".docker/run/main/cmd"]),
        &[LAUNCHER, ENGINE_FLAG].join("\0"),
    )?;
    Ok(())
}

/// Hard-link `program` to `dst`, copying when the link is not possible
/// (for instance across filesystems).
fn install_launcher(program: &Path, dst: &Path) -> io::Result<()> {
    match fs::hard_link(program, dst) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("Hard link of {} failed ({}), copying", program.display(), e);
            fs::copy(program, dst).map(|_| ())
        }
    }
}
