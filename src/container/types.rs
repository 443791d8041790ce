//! Container struct definition
//!
//! A Container is an execution context rooted at a directory. Everything it
//! owns, including its persisted command records, lives under that root.

use std::path::{Component, Path, PathBuf};

use super::command::Command;
use crate::error::Result;

/// Id of the distinguished root container.
pub const ROOT_CONTAINER_ID: &str = "c0";

/// Prefixes searched for `bin` and `sbin` when building a container's `PATH`.
const PATH_PREFIXES: [&str; 3] = ["usr/local", "usr", ""];

/// A filesystem-rooted execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Allocated name, unique within the engine's container namespace
    pub id: String,
    /// Absolute path of the container's root directory
    pub root: PathBuf,
}

impl Container {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }

    /// Join `segments` under the container root.
    ///
    /// Absolute segments are taken relative to the root and `..` never climbs
    /// above it, so the result always stays inside the container. No I/O.
    pub fn path<I, P>(&self, segments: I) -> PathBuf
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut out = self.root.clone();
        let mut depth = 0usize;
        for segment in segments {
            for component in segment.as_ref().components() {
                match component {
                    Component::Normal(part) => {
                        out.push(part);
                        depth += 1;
                    }
                    Component::ParentDir if depth > 0 => {
                        out.pop();
                        depth -= 1;
                    }
                    _ => {}
                }
            }
        }
        out
    }

    /// Create and persist a command record in this container.
    ///
    /// An empty `name` allocates the next free slot in the container's
    /// command namespace.
    pub fn new_command<I, S>(&self, name: &str, path: &str, args: I) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cmd = Command::new(self.clone(), name, path, args);
        cmd.store()?;
        Ok(cmd)
    }

    /// Load a previously stored command record by name.
    pub fn get_command(&self, name: &str) -> Result<Command> {
        let mut cmd = Command::new(self.clone(), name, "", Vec::<String>::new());
        cmd.load()?;
        Ok(cmd)
    }

    /// Minimal environment for processes run in this container, as
    /// `KEY=VALUE` entries: `HOME` is the container root and `PATH` lists the
    /// container's own `bin` and `sbin` directories.
    pub fn base_env(&self) -> Vec<String> {
        let paths: Vec<String> = PATH_PREFIXES
            .iter()
            .flat_map(|prefix| {
                ["bin", "sbin"]
                    .iter()
                    .map(move |dir| self.path([*prefix, *dir]).display().to_string())
            })
            .collect();
        vec![
            format!("HOME={}", self.root.display()),
            format!("PATH={}", paths.join(":")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Container {
        Container::new("7", "/srv/engine/containers/7")
    }

    #[test]
    fn test_path_joins_segments() {
        let c = container();
        assert_eq!(
            c.path([".docker/run/exec", "3", "cmd"]),
            PathBuf::from("/srv/engine/containers/7/.docker/run/exec/3/cmd")
        );
    }

    #[test]
    fn test_path_no_segments_is_root() {
        let c = container();
        assert_eq!(c.path(Vec::<&str>::new()), c.root);
        assert_eq!(c.path([""]), c.root);
    }

    #[test]
    fn test_path_absolute_segment_is_relative_to_root() {
        let c = container();
        assert_eq!(c.path(["/etc", "hosts"]), PathBuf::from("/srv/engine/containers/7/etc/hosts"));
    }

    #[test]
    fn test_path_stays_inside_root() {
        let c = container();
        assert_eq!(c.path(["a/../../.."]), c.root);
        assert_eq!(c.path(["a/b/../c"]), PathBuf::from("/srv/engine/containers/7/a/c"));
    }

    #[test]
    fn test_base_env() {
        let c = container();
        let env = c.base_env();
        assert_eq!(env[0], "HOME=/srv/engine/containers/7");
        assert_eq!(
            env[1],
            "PATH=/srv/engine/containers/7/usr/local/bin:/srv/engine/containers/7/usr/local/sbin:\
             /srv/engine/containers/7/usr/bin:/srv/engine/containers/7/usr/sbin:\
             /srv/engine/containers/7/bin:/srv/engine/containers/7/sbin"
        );
    }
}
