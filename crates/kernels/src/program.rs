use std::ops::Deref;

use crate::{Error, Validate};

/// A request or batch scoped to a points program.
///
/// Program-scoped accrual is always time-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program<T> {
    #[cfg_attr(feature = "serde", serde(flatten))]
    inner: T,
    #[cfg_attr(feature = "serde", serde(default))]
    program: i64,
}

impl<T> Program<T> {
    /// Wrap `inner` into `program`.
    pub fn new(inner: T, program: i64) -> Self {
        Self { inner, program }
    }

    /// Get the program id.
    pub fn program(&self) -> i64 {
        self.program
    }

    /// Get the wrapped value.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Unwrap.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Wrap another value into the same program.
    pub fn scope<U>(&self, inner: U) -> Program<U> {
        Program::new(inner, self.program)
    }

    /// Always `false`: programs accrue by time.
    pub fn is_per_block(&self) -> bool {
        false
    }
}

impl<T> Deref for Program<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: Validate> Validate for Program<T> {
    fn validate(&self) -> crate::Result<()> {
        self.inner.validate()?;
        if self.program < 0 {
            return Err(Error::NegativeProgram);
        }
        Ok(())
    }
}
