//! Test suites for the framing and dispatch core.

pub(crate) mod support;
