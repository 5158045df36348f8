use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::error::{GuestError, InitFailure};
use crate::ty::{Type, TypeRef};

/// Class-initialization lifecycle. `Initialized` and `Erroneous` are
/// terminal; `Erroneous` is sticky for the lifetime of the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Initialized,
    Erroneous,
}

/// External linking/initialization hook supplied at class-definition time.
///
/// The engine drives the one-shot protocol and failure-state transitions;
/// the hook performs the actual linking and `<clinit>` execution.
pub trait ClassInitializer: Send + Sync {
    fn initialize(&self, class: &TypeRef) -> Result<(), InitFailure>;
}

impl<F> ClassInitializer for F
where
    F: Fn(&TypeRef) -> Result<(), InitFailure> + Send + Sync,
{
    fn initialize(&self, class: &TypeRef) -> Result<(), InitFailure> {
        self(class)
    }
}

#[derive(Debug)]
pub(crate) struct InitControl {
    sync: Mutex<InitSync>,
    outcome: Condvar,
}

#[derive(Debug)]
struct InitSync {
    state: InitState,
    // Thread driving the in-flight run. Recursive references from it pass
    // through; every other thread waits for the published outcome.
    initializer: Option<ThreadId>,
}

enum Claim {
    /// The caller moved `Uninitialized` to `Initializing` and now owns the run.
    Claimed,
    /// Recursive reference from the thread that owns the in-flight run.
    Reentrant,
    Done,
    Erroneous,
}

impl InitControl {
    pub(crate) fn new() -> Self {
        Self {
            sync: Mutex::new(InitSync {
                state: InitState::Uninitialized,
                initializer: None,
            }),
            outcome: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> InitState {
        self.sync.lock().state
    }

    /// Claims the initialization run. A thread observing `Initializing` from
    /// another thread blocks until that run publishes a terminal state or
    /// reopens the retry window, then acts on what it wakes to; only the
    /// initializing thread short-circuits mid-flight.
    fn claim(&self) -> Claim {
        let mut sync = self.sync.lock();
        loop {
            match sync.state {
                InitState::Uninitialized => {
                    sync.state = InitState::Initializing;
                    sync.initializer = Some(thread::current().id());
                    return Claim::Claimed;
                }
                InitState::Initializing => {
                    if sync.initializer == Some(thread::current().id()) {
                        return Claim::Reentrant;
                    }
                    self.outcome.wait(&mut sync);
                }
                InitState::Initialized => return Claim::Done,
                InitState::Erroneous => return Claim::Erroneous,
            }
        }
    }

    fn complete(&self, state: InitState) {
        let mut sync = self.sync.lock();
        sync.state = state;
        sync.initializer = None;
        self.outcome.notify_all();
    }
}

impl Type {
    /// Current initialization state. Primitives and arrays need no
    /// initialization and always report `Initialized`.
    pub fn initialization_state(&self) -> InitState {
        match self.object_data() {
            Some(data) => data.init.state(),
            None => InitState::Initialized,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialization_state() == InitState::Initialized
    }

    /// Drives the one-shot initialization protocol.
    ///
    /// Exactly one thread runs the sequence; a concurrent caller blocks
    /// until that run's outcome is published and then reports it (a
    /// recursive reference from the initializing thread itself returns
    /// immediately). The superclass is initialized first. A guest exception
    /// raised by the external initializer is re-wrapped as
    /// `ExceptionInInitializerError`
    /// with the original as cause when it is assignable to the guest
    /// `Exception` hierarchy; guest `Error`-side throwables propagate
    /// unchanged. Linkage-class failures transition the type to `Erroneous`
    /// permanently: every later attempt re-signals without re-running the
    /// sequence.
    pub fn safe_initialize(self: &Arc<Self>) -> Result<(), GuestError> {
        let Some(data) = self.object_data() else {
            return Ok(());
        };
        match data.init.claim() {
            Claim::Done | Claim::Reentrant => return Ok(()),
            Claim::Erroneous => {
                let ctx = self.context();
                return Err(ctx.guest_error(
                    ctx.no_class_def_found_error(),
                    format!("Could not initialize class {}", self.name()),
                ));
            }
            Claim::Claimed => {}
        }

        if let Some(sup) = self.superclass() {
            if let Err(err) = sup.safe_initialize() {
                data.init.complete(InitState::Uninitialized);
                return Err(err);
            }
        }

        let outcome = match &data.initializer {
            Some(hook) => hook.initialize(self),
            None => Ok(()),
        };
        match outcome {
            Ok(()) => {
                data.init.complete(InitState::Initialized);
                Ok(())
            }
            Err(InitFailure::GuestException(cause)) => {
                data.init.complete(InitState::Uninitialized);
                let ctx = self.context();
                if ctx.exception_type().is_assignable_from(cause.class()) {
                    Err(ctx.guest_error_with_cause(ctx.exception_in_initializer_error(), cause))
                } else {
                    Err(cause)
                }
            }
            Err(InitFailure::Linkage { kind, message }) => {
                data.init.complete(InitState::Erroneous);
                warn!(ty = %self.name(), %kind, "initialization failed, type is now erroneous");
                let ctx = self.context();
                Err(ctx.guest_error(ctx.linkage_error_class(kind), message))
            }
        }
    }
}
