//! Record real calls once, replay them from storage afterwards.
//!
//! A session opened on empty storage records: the fake forwards every call to
//! the real implementation and keeps what came back. [`RecordingSession::save`]
//! writes it out. A session opened on storage that already holds calls
//! replays them in order without touching the real implementation.

use crate::app::faker::{FakeOptions, Faker};
use crate::domain::call::{FakeCall, RecordedCall, WritableCall};
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::fake::FakeObject;
use crate::domain::ports::{BaseImplementation, CallStorage};
use crate::domain::types::TypeInfo;
use crate::domain::value::Value;
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

enum Mode {
    Recording(Mutex<Vec<RecordedCall>>),
    Replaying(Mutex<VecDeque<RecordedCall>>),
}

pub struct RecordingSession {
    storage: Arc<dyn CallStorage>,
    mode: Arc<Mode>,
}

impl RecordingSession {
    pub fn open(storage: Arc<dyn CallStorage>) -> Result<Self> {
        let mode = match storage.load()? {
            Some(calls) => {
                info!(calls = calls.len(), "replaying recorded calls");
                Mode::Replaying(Mutex::new(calls.into()))
            }
            None => {
                info!("recording calls");
                Mode::Recording(Mutex::new(Vec::new()))
            }
        };
        Ok(Self {
            storage,
            mode: Arc::new(mode),
        })
    }

    pub fn is_replaying(&self) -> bool {
        matches!(*self.mode, Mode::Replaying(_))
    }

    /// Calls not yet replayed, or recorded so far.
    pub fn pending(&self) -> usize {
        match &*self.mode {
            Mode::Recording(calls) => calls.lock().unwrap_or_else(PoisonError::into_inner).len(),
            Mode::Replaying(calls) => calls.lock().unwrap_or_else(PoisonError::into_inner).len(),
        }
    }

    /// A fake of `type_info` bound to this session. `real` is only called
    /// while recording.
    pub fn fake(
        &self,
        faker: &Faker,
        type_info: &Arc<TypeInfo>,
        real: impl BaseImplementation + 'static,
    ) -> FakeResult<FakeObject> {
        let mode = Arc::clone(&self.mode);
        let real: Arc<dyn BaseImplementation> = Arc::new(real);
        let base = move |call: &mut WritableCall| -> FakeResult<()> {
            match &*mode {
                Mode::Recording(calls) => {
                    real.invoke(call)?;
                    let recorded = record(call);
                    calls
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(recorded);
                    Ok(())
                }
                Mode::Replaying(calls) => {
                    let next = calls.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
                    replay(call, next)
                }
            }
        };
        faker.fake_with(type_info, FakeOptions::new().wrapping(base))
    }

    /// Write the recorded calls to storage. Does nothing when replaying.
    pub fn save(&self) -> Result<()> {
        if let Mode::Recording(calls) = &*self.mode {
            let calls = calls.lock().unwrap_or_else(PoisonError::into_inner).clone();
            debug!(calls = calls.len(), "saving recorded calls");
            self.storage.save(&calls)?;
        }
        Ok(())
    }
}

fn record(call: &WritableCall) -> RecordedCall {
    let method = call.method();
    let values = call.argument_values();
    RecordedCall {
        method: method.id.clone(),
        output_arguments: method
            .by_ref_positions()
            .into_iter()
            .filter_map(|i| values.get(i).cloned())
            .collect(),
        return_value: call.return_value().cloned().unwrap_or(Value::Unit),
    }
}

fn replay(call: &mut WritableCall, next: Option<RecordedCall>) -> FakeResult<()> {
    let method = Arc::clone(call.method());
    let Some(recorded) = next else {
        return Err(FakeError::Expectation(format!(
            "The call {} was not recorded: the recorded call sequence is exhausted.",
            method.id
        )));
    };
    if recorded.method != method.id {
        return Err(FakeError::Expectation(format!(
            "The call {} does not match the next recorded call {}.",
            method.id, recorded.method
        )));
    }
    for (position, value) in method
        .by_ref_positions()
        .into_iter()
        .zip(recorded.output_arguments)
    {
        call.set_argument_value(position, value)?;
    }
    call.set_return_value(recorded.return_value);
    Ok(())
}
