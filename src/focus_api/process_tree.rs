use std::collections::HashMap;

use anyhow::{anyhow, Result};
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub name: String,
    pub parent: Option<u32>,
}

/// Snapshot of the running processes, enough to walk from a window's owner to its children.
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: HashMap<u32, ProcessEntry>,
}

impl ProcessTable {
    pub fn from_system(system: &System) -> Self {
        let processes = system
            .processes()
            .iter()
            .map(|(pid, process)| {
                (
                    pid.as_u32(),
                    ProcessEntry {
                        name: process.name().to_string_lossy().to_string(),
                        parent: process.parent().map(|p| p.as_u32()),
                    },
                )
            })
            .collect();
        Self { processes }
    }

    pub fn insert(&mut self, pid: u32, name: &str, parent: Option<u32>) {
        self.processes.insert(
            pid,
            ProcessEntry {
                name: name.into(),
                parent,
            },
        );
    }

    fn name(&self, pid: u32) -> Option<&str> {
        self.processes.get(&pid).map(|p| p.name.as_str())
    }

    /// Lowest pid among the children, which is the one started first in practice.
    fn first_child(&self, pid: u32) -> Option<u32> {
        self.processes
            .iter()
            .filter(|(_, p)| p.parent == Some(pid))
            .map(|(child, _)| *child)
            .min()
    }

    /// Name of the application a focused window belongs to. A focused terminal emulator is
    /// looked through: what runs inside it (the shell's child, or the shell) is reported instead.
    pub fn focused_app_name(&self, pid: u32, terminal: Option<&str>) -> Option<String> {
        let name = self.name(pid)?;
        if terminal != Some(name) {
            return Some(name.to_string());
        }

        let Some(shell) = self.first_child(pid) else {
            return Some(name.to_string());
        };
        let inner = self.first_child(shell).unwrap_or(shell);
        self.name(inner).map(str::to_string)
    }
}

/// Keeps a [System] around between samples so only the process list is refreshed.
pub struct ProcessResolver {
    system: System,
}

impl ProcessResolver {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    pub fn resolve(&mut self, pid: u32) -> Result<String> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        if self.system.process(Pid::from_u32(pid)).is_none() {
            return Err(anyhow!("Process {pid} is gone"));
        }
        let terminal = std::env::var("TERM").ok();
        ProcessTable::from_system(&self.system)
            .focused_app_name(pid, terminal.as_deref())
            .ok_or_else(|| anyhow!("Couldn't resolve name of process {pid}"))
    }
}

impl Default for ProcessResolver {
    fn default() -> Self {
        Self::new()
    }
}
