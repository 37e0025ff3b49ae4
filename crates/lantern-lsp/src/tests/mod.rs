//! Test suites for the server bootstrap and lifecycle.

mod support;
