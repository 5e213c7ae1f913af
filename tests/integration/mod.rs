//! Integration tests for AppZero Accounts
//!
//! These tests run the services and HTTP endpoints against a real SQLite
//! database with all middleware except rate limiting.

mod api_tests;
mod invite_tests;
