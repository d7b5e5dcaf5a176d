#![allow(dead_code)]
pub mod constants;

use async_trait::async_trait;
use dbtuner::connection::{ConnectionDescriptor, CredentialStrategy};
use dbtuner::error::{Error, Result};
use dbtuner::store::{Connector, Session};
use std::sync::{Arc, Mutex};

/// Everything the fake driver observed during one test.
#[derive(Debug, Default)]
pub struct Calls {
    pub connects: Vec<ConnectionDescriptor>,
    pub scripts: Vec<String>,
    pub closes: usize,
}

/// How the fake session should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed { rows: u64 },
    FailExecute,
    FailClose,
    RefuseConnect,
}

/// In-memory stand-in for the SQL Server connector.
#[derive(Clone)]
pub struct FakeConnector {
    pub calls: Arc<Mutex<Calls>>,
    behavior: Behavior,
}

impl FakeConnector {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Calls::default())),
            behavior,
        }
    }

    pub fn connects(&self) -> usize {
        self.calls.lock().unwrap().connects.len()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.calls.lock().unwrap().scripts.clone()
    }

    pub fn closes(&self) -> usize {
        self.calls.lock().unwrap().closes
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        _credential: &dyn CredentialStrategy,
    ) -> Result<Box<dyn Session>> {
        self.calls.lock().unwrap().connects.push(descriptor.clone());
        if self.behavior == Behavior::RefuseConnect {
            return Err(Error::ConnectionFailed {
                source: "login failed".into(),
                context: format!("connecting to {}", descriptor.server),
            });
        }
        Ok(Box::new(FakeSession {
            calls: Arc::clone(&self.calls),
            behavior: self.behavior,
        }))
    }
}

pub struct FakeSession {
    calls: Arc<Mutex<Calls>>,
    behavior: Behavior,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, script: &str) -> Result<u64> {
        self.calls.lock().unwrap().scripts.push(script.to_string());
        match self.behavior {
            Behavior::Succeed { rows } => Ok(rows),
            Behavior::FailClose => Ok(0),
            _ => Err(Error::ExecutionFailed {
                source: constants::EXECUTION_ERROR.into(),
                context: "fake session".to_string(),
            }),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.calls.lock().unwrap().closes += 1;
        if self.behavior == Behavior::FailClose {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "connection reset",
            )));
        }
        Ok(())
    }
}
