//! Unit tests for the escalation context.

mod monitor_tests;
