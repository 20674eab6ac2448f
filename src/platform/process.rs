//! Process metadata lookups backed by `sysinfo`.

use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, Uid, UpdateKind, Users};

use crate::core::gpu_monitor::{LookupError, ProcessInfo, ProcessInfoSource};

/// Resolves owner, CPU usage and command line for a PID.
///
/// CPU usage is measured over `window`: the process is refreshed, the worker
/// sleeps, and the second refresh yields the delta. Lookups are independent,
/// so several can run in parallel and share one window.
pub struct SysinfoProcessSource {
    window: Duration,
    users: RwLock<Users>,
}

impl SysinfoProcessSource {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            users: RwLock::new(Users::new_with_refreshed_list()),
        }
    }

    fn owner_name(&self, uid: &Uid) -> String {
        self.users
            .read()
            .get_user_by_id(uid)
            .map(|user| user.name().to_string())
            .unwrap_or_else(|| numeric_uid(uid))
    }
}

fn numeric_uid(uid: &Uid) -> String {
    #[cfg(unix)]
    {
        use std::ops::Deref;

        uid.deref().to_string()
    }

    #[cfg(not(unix))]
    {
        format!("{:?}", uid)
    }
}

impl ProcessInfoSource for SysinfoProcessSource {
    fn begin_cycle(&self) {
        // Accounts created since the last frame
        *self.users.write() = Users::new_with_refreshed_list();
    }

    fn lookup(&self, pid: u32) -> Result<ProcessInfo, LookupError> {
        let sys_pid = Pid::from_u32(pid);
        let targets = [sys_pid];
        let mut system = System::new();

        let first = ProcessRefreshKind::nothing()
            .with_cpu()
            .with_user(UpdateKind::OnlyIfNotSet)
            .with_cmd(UpdateKind::OnlyIfNotSet);
        let found = system.refresh_processes_specifics(ProcessesToUpdate::Some(&targets), true, first);
        if found == 0 {
            return Err(LookupError::Vanished(pid));
        }

        thread::sleep(self.window);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&targets),
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        );

        let process = system.process(sys_pid).ok_or(LookupError::Vanished(pid))?;
        let uid = process.user_id().ok_or(LookupError::PermissionDenied(pid))?;

        Ok(ProcessInfo {
            pid,
            owner: self.owner_name(uid),
            cpu_percent: process.cpu_usage(),
            command_line: process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        })
    }
}
