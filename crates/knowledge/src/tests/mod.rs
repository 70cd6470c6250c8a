//! Pipeline-level tests.

pub(crate) mod support;
