//! Dashboard run loop
//!
//! Drives an unlocked dashboard on a single task, applying view commands
//! and push events in arrival order.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::session::{AdminSession, Dashboard};
use crate::export::ExportFormat;
use crate::model::ReservationId;
use crate::push::PushEvent;

/// Actions a view can request while the dashboard runs
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Re-fetch the full list
    Reload,
    /// Delete one reservation
    Remove(ReservationId),
    /// Export the cached list; `None` uses the configured output dir
    Export {
        target: Option<PathBuf>,
        format: ExportFormat,
    },
    /// End the session and clear the gate
    LockOut,
    /// End the session, keep the gate
    Shutdown,
}

/// Why [`Dashboard::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    LockedOut,
    Shutdown,
}

enum PushWake {
    Event(PushEvent),
    Closed,
}

/// Next push event of the session; pending forever when not subscribed
async fn next_push(session: &mut Option<AdminSession>) -> PushWake {
    match session.as_mut().and_then(|s| s.subscription.as_mut()) {
        Some(subscription) => match subscription.next().await {
            Some(event) => PushWake::Event(event),
            None => PushWake::Closed,
        },
        None => std::future::pending().await,
    }
}

impl Dashboard {
    /// Process commands and push events until lock-out or shutdown
    ///
    /// A closed command channel counts as shutdown. Either way the session
    /// is ended before returning, which releases the push subscription.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) -> RunExit {
        let mut queued: VecDeque<Command> = VecDeque::new();

        loop {
            let command = match queued.pop_front() {
                Some(command) => Some(command),
                None => {
                    tokio::select! {
                        command = commands.recv() => command,
                        wake = next_push(&mut self.session) => {
                            match wake {
                                PushWake::Event(event) => self.on_push_event(event),
                                PushWake::Closed => {
                                    tracing::debug!("Push channel closed");
                                    self.drop_subscription();
                                }
                            }
                            continue;
                        }
                    }
                }
            };

            let Some(command) = command else {
                tracing::info!("Command channel closed, stopping dashboard");
                self.close_session().await;
                return RunExit::Shutdown;
            };

            tracing::debug!(command = ?command, "Dashboard command");
            match command {
                Command::Reload => {
                    if let Some(exit) = self.reload(&mut commands, &mut queued).await {
                        return exit;
                    }
                }
                Command::Remove(id) => {
                    // Failures are reported through the notifier
                    let _ = self.remove(&id).await;
                }
                Command::Export { target, format } => {
                    let _ = self.export(target.as_deref(), format);
                }
                Command::LockOut => {
                    return self.finish_locked_out().await;
                }
                Command::Shutdown => {
                    self.close_session().await;
                    return RunExit::Shutdown;
                }
            }
        }
    }

    /// Reload that can be abandoned by a lock-out or shutdown
    async fn reload(
        &mut self,
        commands: &mut mpsc::Receiver<Command>,
        queued: &mut VecDeque<Command>,
    ) -> Option<RunExit> {
        if self.session.is_none() {
            return None;
        }

        let api = Arc::clone(&self.api);
        let mut fetch = api.list();

        loop {
            tokio::select! {
                result = &mut fetch => {
                    self.apply_load(result);
                    return None;
                }
                command = commands.recv() => match command {
                    Some(Command::LockOut) => {
                        tracing::info!("Lock-out during reload, discarding result");
                        drop(fetch);
                        return Some(self.finish_locked_out().await);
                    }
                    Some(Command::Shutdown) | None => {
                        tracing::info!("Shutdown during reload, discarding result");
                        drop(fetch);
                        self.close_session().await;
                        return Some(RunExit::Shutdown);
                    }
                    Some(other) => queued.push_back(other),
                }
            }
        }
    }

    async fn finish_locked_out(&mut self) -> RunExit {
        self.close_session().await;
        if let Err(e) = self.lock_out() {
            tracing::warn!(error = %e, "Failed to clear persisted gate state");
        }
        RunExit::LockedOut
    }
}
