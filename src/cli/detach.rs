use anyhow::Result;

use crate::tracker::Tracker;

/// Side of the fork the caller ended up on.
pub enum Detached {
    /// The background tracker was created, this process should exit.
    Parent,
    /// This process is the background tracker and keeps the instance lock.
    Child(Tracker),
}

/// Moves an acquired tracker into the background. Must run before the async runtime is built.
pub fn detach(tracker: Tracker) -> Result<Detached> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use daemonize::Daemonize;
            use tracing::error;

            let daemonize = Daemonize::new()
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent
                        .inspect_err(|e| error!("Failed to detach on parent side {e:?}"))?;
                    println!("Tracker started in the background.");
                    Ok(Detached::Parent)
                }
                daemonize::Outcome::Child(child) => {
                    child?;
                    Ok(Detached::Child(tracker))
                }
            }
        } else if #[cfg(feature = "win")] {
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::DETACHED_PROCESS;

            // The copy takes the lock again, so it has to be free before the copy starts.
            drop(tracker);
            // Same command line without the flag, so the copy tracks in the foreground.
            let args = std::env::args().skip(1).filter(|arg| arg != "--detach");
            let mut command = std::process::Command::new(std::env::current_exe()?);
            command.args(args);
            command.creation_flags(DETACHED_PROCESS.0);
            command.stdin(std::process::Stdio::null());
            command.stdout(std::process::Stdio::null());
            command.stderr(std::process::Stdio::null());
            #[allow(clippy::zombie_processes)]
            command.spawn()?;
            println!("Tracker started in the background.");
            Ok(Detached::Parent)
        } else {
            drop(tracker);
            Err(anyhow::anyhow!("--detach isn't supported on this platform"))
        }
    }
}
