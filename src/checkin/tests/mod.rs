//! Unit tests for the check-in context.
