//! Navigation guards

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use thiserror::Error;

/// What a guard decided about a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Let the next guard decide
    Continue,
    /// Drop the navigation without touching router state
    Abort,
    /// Navigate somewhere else instead
    Redirect(String),
}

impl From<bool> for GuardOutcome {
    fn from(allow: bool) -> Self {
        if allow {
            GuardOutcome::Continue
        } else {
            GuardOutcome::Abort
        }
    }
}

impl From<&str> for GuardOutcome {
    fn from(path: &str) -> Self {
        GuardOutcome::Redirect(path.to_string())
    }
}

impl From<String> for GuardOutcome {
    fn from(path: String) -> Self {
        GuardOutcome::Redirect(path)
    }
}

/// A guard that failed instead of deciding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct GuardError(pub String);

impl From<&str> for GuardError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for GuardError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

pub type GuardResult = Result<GuardOutcome, GuardError>;

type GuardFn = dyn Fn(Option<String>, String) -> LocalBoxFuture<'static, GuardResult>;

/// A check run before a navigation completes, given `(from, to)`
#[derive(Clone)]
pub struct Guard(Rc<GuardFn>);

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

impl Guard {
    /// A guard that decides immediately
    pub fn new<F, O>(check: F) -> Self
    where
        F: Fn(Option<&str>, &str) -> O + 'static,
        O: Into<GuardOutcome>,
    {
        Self(Rc::new(move |from, to| {
            let outcome = check(from.as_deref(), &to).into();
            future::ready(Ok(outcome)).boxed_local()
        }))
    }

    /// A guard that decides immediately but may fail
    pub fn fallible<F>(check: F) -> Self
    where
        F: Fn(Option<&str>, &str) -> GuardResult + 'static,
    {
        Self(Rc::new(move |from, to| {
            future::ready(check(from.as_deref(), &to)).boxed_local()
        }))
    }

    /// A guard that decides asynchronously
    pub fn future<F, Fut>(check: F) -> Self
    where
        F: Fn(Option<String>, String) -> Fut + 'static,
        Fut: Future<Output = GuardResult> + 'static,
    {
        Self(Rc::new(move |from, to| check(from, to).boxed_local()))
    }

    pub fn check(&self, from: Option<String>, to: String) -> LocalBoxFuture<'static, GuardResult> {
        (self.0)(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_outcome_conversions() {
        assert_eq!(GuardOutcome::from(true), GuardOutcome::Continue);
        assert_eq!(GuardOutcome::from(false), GuardOutcome::Abort);
        assert_eq!(
            GuardOutcome::from("/login"),
            GuardOutcome::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_sync_guard() {
        let guard = Guard::new(|_, to| to != "/x");
        assert_eq!(
            block_on(guard.check(None, "/".to_string())),
            Ok(GuardOutcome::Continue)
        );
        assert_eq!(
            block_on(guard.check(Some("/".to_string()), "/x".to_string())),
            Ok(GuardOutcome::Abort)
        );
    }

    #[test]
    fn test_async_and_fallible_guards() {
        let guard = Guard::future(|from, _| async move {
            Ok(match from {
                Some(_) => GuardOutcome::Continue,
                None => GuardOutcome::Redirect("/welcome".to_string()),
            })
        });
        assert_eq!(
            block_on(guard.check(None, "/".to_string())),
            Ok(GuardOutcome::Redirect("/welcome".to_string()))
        );

        let failing = Guard::fallible(|_, _| Err("session expired".into()));
        assert_eq!(
            block_on(failing.check(None, "/".to_string())),
            Err(GuardError("session expired".to_string()))
        );
    }
}
