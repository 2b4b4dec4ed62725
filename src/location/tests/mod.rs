//! Unit tests for the location context.
