//! Guarded, haltable callback chains.
//!
//! A callback runs only when its branch matches the transition being
//! performed. Plain handlers (before, after, failure) run in declaration
//! order and may be stopped by a terminator. Around handlers wrap each other
//! and receive a [`Next`] continuation instead.

use crate::core::{Branch, Query, State};
use crate::effects::transition::Transition;
use crate::error::Interrupt;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// When a callback runs relative to the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Before,
    After,
    Around,
    Failure,
}

impl CallbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Before => "before",
            CallbackKind::After => "after",
            CallbackKind::Around => "around",
            CallbackKind::Failure => "failure",
        }
    }
}

pub type Handler<O, S> =
    Arc<dyn Fn(&mut O, &Transition<O, S>) -> Result<Value, Interrupt> + Send + Sync>;

pub type AroundHandler<O, S> =
    Arc<dyn Fn(&mut O, &Transition<O, S>, Next<'_, O>) -> Result<(), Interrupt> + Send + Sync>;

/// Decides from a handler's result whether the chain should halt.
pub type Terminator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

type Continuation<'a, O> = dyn FnMut(&mut O) -> Result<(), Interrupt> + 'a;

/// The rest of an around chain.
///
/// An around handler that returns without calling [`run`](Self::run) halts
/// the chain. Errors returned by `run` should be propagated with `?`; doing
/// so skips the handler's remaining code the same way the rest of the chain
/// was skipped.
///
/// A handler that halts after `run` returned only stops its own after-yield
/// code: `run` returns `Ok` to every enclosing handler so they unwind
/// normally, and the chain as a whole then reports the halt.
pub struct Next<'a, O> {
    rest: &'a mut Continuation<'a, O>,
}

impl<'a, O> Next<'a, O> {
    pub(crate) fn new(rest: &'a mut Continuation<'a, O>) -> Self {
        Self { rest }
    }

    /// Run the rest of the chain.
    pub fn run(self, object: &mut O) -> Result<(), Interrupt> {
        (self.rest)(object)
    }
}

pub(crate) enum Handlers<O, S> {
    Plain(Vec<Handler<O, S>>),
    Around(Vec<AroundHandler<O, S>>),
}

/// A typed handler chain attached to a machine.
///
/// Built through [`CallbackBuilder`](crate::builder::CallbackBuilder).
pub struct Callback<O, S> {
    kind: CallbackKind,
    handlers: Handlers<O, S>,
    branch: Branch<O, S>,
    terminator: Option<Terminator>,
}

impl<O, S: State> Callback<O, S> {
    pub(crate) fn new(
        kind: CallbackKind,
        handlers: Handlers<O, S>,
        branch: Branch<O, S>,
        terminator: Option<Terminator>,
    ) -> Self {
        Self {
            kind,
            handlers,
            branch,
            terminator,
        }
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    pub fn is_around(&self) -> bool {
        self.kind == CallbackKind::Around
    }

    pub fn branch(&self) -> &Branch<O, S> {
        &self.branch
    }

    pub fn has_terminator(&self) -> bool {
        self.terminator.is_some()
    }

    pub(crate) fn with_default_terminator(mut self, terminator: Option<&Terminator>) -> Self {
        if self.terminator.is_none() {
            self.terminator = terminator.cloned();
        }
        self
    }

    /// Whether this callback's branch accepts the transition, guards included.
    pub fn applies(&self, object: &O, transition: &Transition<O, S>) -> bool {
        let query = Query {
            from: Some(transition.from().clone()),
            to: Some(transition.to().clone()),
            on: Some(transition.event().to_string()),
            guard: true,
        };
        self.branch.matches(object, &query)
    }

    /// Run the plain handlers.
    ///
    /// Returns `Ok(false)` without running anything when the branch does not
    /// match. Around callbacks must go through [`call_around`](Self::call_around).
    pub fn call(&self, object: &mut O, transition: &Transition<O, S>) -> Result<bool, Interrupt> {
        if !self.applies(object, transition) {
            tracing::trace!(
                "Skipping {} callback for {}: branch does not match",
                self.kind.as_str(),
                transition
            );
            return Ok(false);
        }

        tracing::trace!("Running {} callback for {}", self.kind.as_str(), transition);
        match &self.handlers {
            Handlers::Plain(handlers) => {
                for handler in handlers {
                    let result = handler(object, transition)?;
                    if self.terminator.as_ref().is_some_and(|t| t(&result)) {
                        tracing::trace!("Terminator halted {} callback", self.kind.as_str());
                        return Err(Interrupt::Halt);
                    }
                }
                Ok(true)
            }
            Handlers::Around(_) => self.call_around(object, transition, &mut |_: &mut O| -> Result<(), Interrupt> {
                Ok(())
            }),
        }
    }

    /// Run the around handlers wrapped around `rest`.
    ///
    /// Handlers are entered in declaration order, each wrapping the next,
    /// with `rest` innermost. Returns `Ok(false)` without running anything,
    /// `rest` included, when the branch does not match.
    pub fn call_around(
        &self,
        object: &mut O,
        transition: &Transition<O, S>,
        rest: &mut Continuation<'_, O>,
    ) -> Result<bool, Interrupt> {
        if !self.applies(object, transition) {
            tracing::trace!(
                "Skipping around callback for {}: branch does not match",
                transition
            );
            return Ok(false);
        }

        tracing::trace!("Running around callback for {}", transition);
        match &self.handlers {
            Handlers::Around(handlers) => {
                run_chain(handlers, object, transition, rest)?;
                if transition.is_unwind_halted() {
                    tracing::trace!("Around callback for {} halted while unwinding", transition);
                    return Err(Interrupt::Halt);
                }
                Ok(true)
            }
            Handlers::Plain(_) => {
                self.call(object, transition)?;
                rest(object)?;
                Ok(true)
            }
        }
    }
}

fn run_chain<O, S: State>(
    handlers: &[AroundHandler<O, S>],
    object: &mut O,
    transition: &Transition<O, S>,
    rest: &mut Continuation<'_, O>,
) -> Result<(), Interrupt> {
    let Some((handler, remaining)) = handlers.split_first() else {
        return rest(object);
    };

    let mut yielded = false;
    let mut continued = false;
    let result = {
        let mut inner = |object: &mut O| -> Result<(), Interrupt> {
            yielded = true;
            match run_chain(remaining, object, transition, &mut *rest) {
                Err(Interrupt::Halt) if transition.is_unwind_halted() => {}
                other => other?,
            }
            continued = true;
            Ok(())
        };
        handler(object, transition, Next::new(&mut inner))
    };

    match result {
        Ok(()) if yielded => Ok(()),
        Ok(()) => {
            tracing::trace!("Around handler for {} did not yield", transition);
            Err(Interrupt::Halt)
        }
        Err(Interrupt::Halt) if continued => {
            transition.mark_unwind_halted();
            Err(Interrupt::Halt)
        }
        Err(e) => Err(e),
    }
}

impl<O, S> fmt::Debug for Callback<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = match &self.handlers {
            Handlers::Plain(handlers) => handlers.len(),
            Handlers::Around(handlers) => handlers.len(),
        };
        f.debug_struct("Callback")
            .field("kind", &self.kind)
            .field("handlers", &handlers)
            .field("terminator", &self.terminator.is_some())
            .finish()
    }
}
