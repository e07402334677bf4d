//! Binary-level tests: argument parsing and end-to-end runs against a JSON store
//! in a temporary directory.

mod cli_tests;
mod scenario_tests;
