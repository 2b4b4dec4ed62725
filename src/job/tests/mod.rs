//! Unit tests for the job context.

mod transition_tests;
