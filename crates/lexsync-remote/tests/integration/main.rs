//! Integration tests for lexsync-remote
//!
//! Uses wiremock to simulate the case-management API and verifies the
//! request shape, response handling, and status mapping of the client.

mod common;

mod test_health;
mod test_push_change;
