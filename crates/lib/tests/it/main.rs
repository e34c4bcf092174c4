/*! Integration tests for emberstore.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - acl: registry lifecycle, persistence overlay, and dispatch-level checks
 * - server: end-to-end tests over a real TCP connection
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("emberstore=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod acl;
mod helpers;
mod server;
