//! Integration test runner
//!
//! SQLite tests run against throwaway files and always execute. PostgreSQL
//! tests need a reachable server and skip themselves otherwise:
//!
//! ```text
//! TEST_DB_HOST=localhost TEST_DB_PORT=5433 cargo test --test integration
//! ```
//!
//! Environment variables (with defaults):
//! - TEST_DB_HOST: localhost
//! - TEST_DB_PORT: 5433
//! - TEST_DB_NAME: test_db
//! - TEST_DB_USER: test_user
//! - TEST_DB_PASSWORD: test_password

mod common;

#[path = "integration/sqlite_tests.rs"]
mod sqlite_tests;

#[path = "integration/worksheet_flow.rs"]
mod worksheet_flow;

#[path = "integration/postgres_tests.rs"]
mod postgres_tests;
