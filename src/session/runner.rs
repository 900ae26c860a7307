//! Runs a [`RideSession`] on its own worker thread.
//!
//! The host pushes [`SessionEvent`]s into a crossbeam channel; the worker
//! applies them in order. Stopping the handle shuts the worker down,
//! checkpoints W' if a ride is in progress, and joins the thread.

use crate::sensors::types::SessionEvent;
use crate::session::ride::RideSession;
use crate::session::state::SessionState;
use crossbeam::channel::{self, Sender};
use std::thread::{self, JoinHandle};

enum Command {
    Event(SessionEvent),
    Shutdown,
}

/// Spawns session workers.
pub struct SessionRunner;

impl SessionRunner {
    /// Move `session` to a worker thread and return its handle.
    pub fn spawn(session: RideSession) -> std::io::Result<SessionHandle> {
        let state = session.state();
        let (tx, rx) = channel::unbounded::<Command>();

        let worker = thread::Builder::new()
            .name("climbwise-session".to_string())
            .spawn(move || {
                let mut session = session;
                for command in rx.iter() {
                    match command {
                        Command::Event(event) => session.handle(event),
                        Command::Shutdown => break,
                    }
                }
                session.emergency_shutdown();
                tracing::debug!("Session worker stopped");
            })?;

        Ok(SessionHandle {
            tx: Some(tx),
            state,
            worker: Some(worker),
        })
    }
}

/// Owner of a running session worker.
pub struct SessionHandle {
    tx: Option<Sender<Command>>,
    state: SessionState,
    worker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Queue an event. Returns false once the session has stopped.
    pub fn send(&self, event: SessionEvent) -> bool {
        match &self.tx {
            Some(tx) => tx.send(Command::Event(event)).is_ok(),
            None => false,
        }
    }

    /// Read handle for the published outputs.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    /// Drain queued events, checkpoint if recording, and join the worker.
    pub fn stop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Session worker panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
