//! Builder for callbacks.

use crate::builder::branch::BranchBuilder;
use crate::builder::error::{check, validate, BuildError};
use crate::core::State;
use crate::effects::callback::{AroundHandler, Handler, Handlers};
use crate::effects::{Callback, CallbackKind, Next, Terminator, Transition};
use crate::error::Interrupt;
use serde_json::Value;
use std::sync::Arc;

/// Fluent builder for [`Callback`].
///
/// Plain handlers are added with [`run`](Self::run) and around handlers
/// with [`run_around`](Self::run_around); the kind of handler must match the
/// kind of callback. The callback's branch defaults to matching every
/// transition.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::CallbackBuilder;
/// use switchyard::effects::Transition;
/// use switchyard::Interrupt;
///
/// struct Vehicle {
///     log: Vec<String>,
/// }
///
/// let callback = CallbackBuilder::<Vehicle, String>::before()
///     .from("parked".to_string())
///     .run(|v: &mut Vehicle, t: &Transition<Vehicle, String>| -> Result<(), Interrupt> {
///         v.log.push(format!("leaving {}", t.from()));
///         Ok(())
///     })
///     .build()
///     .unwrap();
///
/// assert!(!callback.is_around());
/// ```
pub struct CallbackBuilder<O, S> {
    kind: CallbackKind,
    branch: BranchBuilder<O, S>,
    plain: Vec<Handler<O, S>>,
    around: Vec<AroundHandler<O, S>>,
    terminator: Option<Terminator>,
}

impl<O, S: State> CallbackBuilder<O, S> {
    pub fn new(kind: CallbackKind) -> Self {
        Self {
            kind,
            branch: BranchBuilder::new(),
            plain: Vec::new(),
            around: Vec::new(),
            terminator: None,
        }
    }

    pub fn before() -> Self {
        Self::new(CallbackKind::Before)
    }

    pub fn after() -> Self {
        Self::new(CallbackKind::After)
    }

    pub fn around() -> Self {
        Self::new(CallbackKind::Around)
    }

    pub fn failure() -> Self {
        Self::new(CallbackKind::Failure)
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    /// Replace the branch deciding which transitions run this callback.
    pub fn matching(mut self, branch: BranchBuilder<O, S>) -> Self {
        self.branch = branch;
        self
    }

    pub fn from(mut self, state: S) -> Self {
        self.branch = self.branch.from(state);
        self
    }

    pub fn to(mut self, state: S) -> Self {
        self.branch = self.branch.to(state);
        self
    }

    pub fn on(mut self, event: impl Into<String>) -> Self {
        self.branch = self.branch.on(event);
        self
    }

    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.branch = self.branch.when(predicate);
        self
    }

    pub fn unless<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.branch = self.branch.unless(predicate);
        self
    }

    /// Add a plain handler. Its result is handed to the terminator.
    pub fn run<F, R>(mut self, handler: F) -> Self
    where
        F: Fn(&mut O, &Transition<O, S>) -> Result<R, Interrupt> + Send + Sync + 'static,
        R: Into<Value>,
    {
        self.plain.push(Arc::new(
            move |object: &mut O, transition: &Transition<O, S>| -> Result<Value, Interrupt> {
                handler(object, transition).map(Into::into)
            },
        ));
        self
    }

    /// Add an around handler. It must call [`Next::run`] to continue.
    pub fn run_around<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut O, &Transition<O, S>, Next<'_, O>) -> Result<(), Interrupt>
            + Send
            + Sync
            + 'static,
    {
        self.around.push(Arc::new(handler));
        self
    }

    /// Halt the chain when a handler's result satisfies `predicate`.
    pub fn terminator<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.terminator = Some(Arc::new(predicate));
        self
    }

    pub fn build(self) -> Result<Callback<O, S>, BuildError> {
        let is_around = self.kind == CallbackKind::Around;
        let mismatched = if is_around {
            !self.plain.is_empty()
        } else {
            !self.around.is_empty()
        };

        validate(vec![
            check(
                !(self.plain.is_empty() && self.around.is_empty()),
                BuildError::NoHandlers,
            ),
            check(
                !mismatched,
                BuildError::HandlerKindMismatch {
                    kind: self.kind.as_str(),
                },
            ),
        ])?;

        let branch = self.branch.build()?;
        let handlers = if is_around {
            Handlers::Around(self.around)
        } else {
            Handlers::Plain(self.plain)
        };
        Ok(Callback::new(self.kind, handlers, branch, self.terminator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vehicle;

    type Callbacks = CallbackBuilder<Vehicle, String>;

    #[test]
    fn callbacks_need_handlers() {
        assert_eq!(Callbacks::after().build().err(), Some(BuildError::NoHandlers));
    }

    #[test]
    fn plain_handlers_rejected_on_around() {
        let result = Callbacks::around()
            .run(|_: &mut Vehicle, _: &Transition<Vehicle, String>| Ok(true))
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::HandlerKindMismatch { kind: "around" })
        );
    }

    #[test]
    fn around_handlers_rejected_on_before() {
        let result = Callbacks::before()
            .run_around(|v, _, next| next.run(v))
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::HandlerKindMismatch { kind: "before" })
        );
    }

    #[test]
    fn branch_errors_surface() {
        let result = Callbacks::failure()
            .matching(BranchBuilder::new().on("ignite").except_on(["park"]))
            .run(|_: &mut Vehicle, _: &Transition<Vehicle, String>| Ok(()))
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::ConflictingOptions {
                first: "on",
                second: "except_on"
            })
        );
    }

    #[test]
    fn builds_typed_callback() {
        let callback = Callbacks::failure()
            .on("ignite")
            .run(|_: &mut Vehicle, _: &Transition<Vehicle, String>| Ok(()))
            .terminator(|value| value.is_null())
            .build()
            .unwrap();

        assert_eq!(callback.kind(), CallbackKind::Failure);
        assert!(callback.has_terminator());
        assert!(!callback.branch().event_requirement().is_all());
    }
}
