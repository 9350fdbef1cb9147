//! In-memory container runtime for tests
//!
//! Simulates the composed environment: a shared volume held in memory,
//! stage containers whose liveness follows a timeline measured from
//! `compose up`, and host-side copies written to the real filesystem.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::RuntimeError;
use crate::runtime::{CommandOutput, ContainerRuntime, HelperRun};

pub const INPUT: &str = "/shared/input/urls.txt";
pub const REPORT: &str = "/shared/analysis/final_report.json";
pub const STATUS_DIR: &str = "/shared/status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// The first `compose down` exits non-zero, as with no prior environment
    PreDown,
    Build,
    Up,
    Mkdir,
    CopyIn,
    /// Copy out of a container exits zero and writes nothing
    LiveCopyNoop,
    /// Helper copy exits non-zero and writes nothing
    HelperCopy,
    /// Helper copy writes the files but still exits non-zero
    HelperCopyLies,
    /// Helper copy exits zero and writes nothing
    HelperCopyNoop,
}

struct State {
    up_at: Option<Instant>,
    volume: BTreeMap<String, Vec<u8>>,
    /// Files that appear on the volume this long after `compose up`
    scheduled: Vec<(Duration, String, Vec<u8>)>,
    exits_after: HashMap<String, Duration>,
    removed: HashSet<String>,
    /// Every file copied in, kept across teardown
    injected: HashMap<String, Vec<u8>>,
    faults: HashSet<Fault>,
    calls: Vec<String>,
    logs: String,
}

pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                up_at: None,
                volume: BTreeMap::new(),
                scheduled: Vec::new(),
                exits_after: HashMap::new(),
                removed: HashSet::new(),
                injected: HashMap::new(),
                faults: HashSet::new(),
                calls: Vec::new(),
                logs: "sluice-aggregator  | waiting for processed documents\n".to_string(),
            }),
        })
    }

    /// Marks the environment as up without going through `compose up`
    pub fn start(&self) {
        self.state.lock().unwrap().up_at = Some(Instant::now());
    }

    pub fn put_file(&self, path: &str, contents: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .volume
            .insert(path.to_string(), contents.to_vec());
    }

    pub fn schedule_file(&self, after: Duration, path: &str, contents: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .scheduled
            .push((after, path.to_string(), contents.to_vec()));
    }

    pub fn exit_container_after(&self, name: &str, after: Duration) {
        self.state
            .lock()
            .unwrap()
            .exits_after
            .insert(name.to_string(), after);
    }

    pub fn remove_container(&self, name: &str) {
        self.state.lock().unwrap().removed.insert(name.to_string());
    }

    pub fn inject(&self, fault: Fault) {
        self.state.lock().unwrap().faults.insert(fault);
    }

    /// Current volume contents at `path`
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().visible().get(path).cloned()
    }

    /// Last contents copied into `path`, even after teardown
    pub fn injected(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().injected.get(path).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl State {
    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn visible(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = self.volume.clone();
        if let Some(up_at) = self.up_at {
            let elapsed = up_at.elapsed();
            for (after, path, contents) in &self.scheduled {
                if elapsed >= *after {
                    files
                        .entry(path.clone())
                        .or_insert_with(|| contents.clone());
                }
            }
        }
        files
    }

    fn exists(&self, name: &str) -> bool {
        self.up_at.is_some() && !self.removed.contains(name)
    }

    fn running(&self, name: &str) -> bool {
        match self.up_at {
            Some(up_at) if self.exists(name) => self
                .exits_after
                .get(name)
                .is_none_or(|after| up_at.elapsed() < *after),
            _ => false,
        }
    }
}

/// Copies a volume file or directory into `dest_dir`, keeping its name
fn export(
    files: &BTreeMap<String, Vec<u8>>,
    src: &str,
    dest_dir: &Path,
) -> std::io::Result<bool> {
    let name = src.rsplit('/').next().unwrap_or(src);

    if let Some(contents) = files.get(src) {
        std::fs::create_dir_all(dest_dir)?;
        std::fs::write(dest_dir.join(name), contents)?;
        return Ok(true);
    }

    let prefix = format!("{}/", src);
    let mut found = false;
    for (path, contents) in files.iter().filter(|(p, _)| p.starts_with(&prefix)) {
        let target = dest_dir.join(name).join(&path[prefix.len()..]);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, contents)?;
        found = true;
    }
    Ok(found)
}

fn io_failure(e: std::io::Error) -> CommandOutput {
    CommandOutput::failed(1, e.to_string())
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn compose_down(&self) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record("down".to_string());
        if state.faults.remove(&Fault::PreDown) {
            return Ok(CommandOutput::failed(1, "no resource found to remove"));
        }
        state.up_at = None;
        state.volume.clear();
        Ok(CommandOutput::ok())
    }

    async fn compose_build(&self) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record("build".to_string());
        if state.faults.contains(&Fault::Build) {
            return Ok(CommandOutput::failed(1, "failed to solve: fetcher"));
        }
        Ok(CommandOutput::ok())
    }

    async fn compose_up(&self) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record("up".to_string());
        if state.faults.contains(&Fault::Up) {
            return Ok(CommandOutput::failed(1, "port is already allocated"));
        }
        state.up_at = Some(Instant::now());
        Ok(CommandOutput::ok())
    }

    async fn compose_logs(&self) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record("logs".to_string());
        Ok(CommandOutput {
            exit_code: 0,
            stdout: state.logs.clone(),
            stderr: String::new(),
        })
    }

    async fn is_running(&self, container: &str) -> Result<bool, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("inspect {}", container));
        Ok(state.running(container))
    }

    async fn exec(&self, container: &str, command: &[String]) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("exec {} {}", container, command.join(" ")));

        if !state.running(container) {
            return Ok(CommandOutput::failed(
                1,
                format!("container {} is not running", container),
            ));
        }

        let argv: Vec<&str> = command.iter().map(String::as_str).collect();
        match argv.as_slice() {
            ["test", "-f", path] => {
                if state.visible().contains_key(*path) {
                    Ok(CommandOutput::ok())
                } else {
                    Ok(CommandOutput::failed(1, ""))
                }
            }
            ["mkdir", "-p", _] if state.faults.contains(&Fault::Mkdir) => {
                Ok(CommandOutput::failed(1, "mkdir: permission denied"))
            }
            ["mkdir", "-p", _] => Ok(CommandOutput::ok()),
            _ => Ok(CommandOutput::failed(127, "executable file not found")),
        }
    }

    async fn copy_to(
        &self,
        local: &Path,
        container: &str,
        remote: &str,
    ) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("cp-in {}:{}", container, remote));

        if state.faults.contains(&Fault::CopyIn) || !state.exists(container) {
            return Ok(CommandOutput::failed(1, "Error: No such container"));
        }

        let contents = match std::fs::read(local) {
            Ok(contents) => contents,
            Err(e) => return Ok(io_failure(e)),
        };
        state.volume.insert(remote.to_string(), contents.clone());
        state.injected.insert(remote.to_string(), contents);
        Ok(CommandOutput::ok())
    }

    async fn copy_from(
        &self,
        container: &str,
        remote: &str,
        local: &Path,
    ) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("cp-out {}:{}", container, remote));

        if !state.exists(container) {
            return Ok(CommandOutput::failed(1, "Error: No such container"));
        }
        if !local.is_dir() {
            return Ok(CommandOutput::failed(1, "destination is not a directory"));
        }
        if state.faults.contains(&Fault::LiveCopyNoop) {
            return Ok(CommandOutput::ok());
        }

        match export(&state.visible(), remote, local) {
            Ok(true) => Ok(CommandOutput::ok()),
            Ok(false) => Ok(CommandOutput::failed(
                1,
                format!("Could not find the file {} in container", remote),
            )),
            Err(e) => Ok(io_failure(e)),
        }
    }

    async fn run_helper(&self, helper: &HelperRun) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        let argv: Vec<&str> = helper.command.iter().map(String::as_str).collect();

        match argv.as_slice() {
            ["test", "-f", path] => {
                state.record(format!("helper test {}", path));
                if state.visible().contains_key(*path) {
                    Ok(CommandOutput::ok())
                } else {
                    Ok(CommandOutput::failed(1, ""))
                }
            }
            ["sh", "-c", _, _, dest, src] => {
                state.record(format!("helper copy {}", src));

                if state.faults.contains(&Fault::HelperCopy) {
                    return Ok(CommandOutput::failed(1, "cp: permission denied"));
                }
                if state.faults.contains(&Fault::HelperCopyNoop) {
                    return Ok(CommandOutput::ok());
                }

                let Some(host_dir) = helper
                    .mounts
                    .iter()
                    .find(|m| m.target == *dest)
                    .map(|m| PathBuf::from(&m.source))
                else {
                    return Ok(CommandOutput::failed(1, "destination not mounted"));
                };

                let copied = match export(&state.visible(), src, &host_dir) {
                    Ok(copied) => copied,
                    Err(e) => return Ok(io_failure(e)),
                };
                if !copied {
                    return Ok(CommandOutput::failed(1, format!("cp: can't stat '{}'", src)));
                }
                if state.faults.contains(&Fault::HelperCopyLies) {
                    return Ok(CommandOutput::failed(1, "exit status lost"));
                }
                Ok(CommandOutput::ok())
            }
            _ => Ok(CommandOutput::failed(127, "unsupported helper command")),
        }
    }
}
