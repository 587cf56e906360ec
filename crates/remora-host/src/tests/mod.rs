//! Behaviour suites for the host runtime core.

mod support;
