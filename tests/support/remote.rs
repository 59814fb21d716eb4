// ABOUTME: A SessionFactory that hands out pre-built scripted sessions.
// ABOUTME: Counts disconnects so tests can check the connection is released.

use super::channel::ScriptedChannel;
use async_trait::async_trait;
use panda::ssh::{Error, Result, Session, SessionFactory};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ScriptedConnection {
    addr: String,
    sessions: Mutex<VecDeque<Session<ScriptedChannel>>>,
    closes: AtomicUsize,
}

impl ScriptedConnection {
    pub fn new(addr: &str, sessions: impl IntoIterator<Item = Session<ScriptedChannel>>) -> Self {
        Self {
            addr: addr.to_string(),
            sessions: Mutex::new(sessions.into_iter().collect()),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ScriptedConnection {
    type Channel = ScriptedChannel;

    fn addr(&self) -> &str {
        &self.addr
    }

    async fn open_session(&self) -> Result<Session<ScriptedChannel>> {
        self.sessions
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Transport("no more sessions".to_string()))
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
