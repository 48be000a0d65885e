//! Recoverable builder errors.
//!
//! Sort mismatches are programmer errors and panic instead; see
//! [crate::term::ty]. Undefined operations (division by zero and the like)
//! are not errors at all: they produce unspecified values of the right sort.
//! Failures to *evaluate* a well-sorted term are a separate concern; see
//! [crate::term::eval::EvalError].

use rug::Integer;
use thiserror::Error;

use crate::sort::Sort;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// A bounded fresh variable was requested with an empty or ill-fitting
    /// range.
    #[error("invalid range [{lo}, {hi}] for a fresh variable of sort {sort}")]
    InvalidRange { sort: Sort, lo: Integer, hi: Integer },
}

pub type Result<T> = std::result::Result<T, BuildError>;
