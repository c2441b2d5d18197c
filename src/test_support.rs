//! Shared PostgreSQL test infrastructure.
//!
//! Starts one PostgreSQL testcontainer for the whole test run and hands each
//! test an isolated, uniquely named database on it.

use std::sync::OnceLock;

use postgres::{Client, NoTls};
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

/// Default credentials for testcontainers-modules postgres
const PG_USER: &str = "postgres";
const PG_PASSWORD: &str = "postgres";
const PG_DB: &str = "postgres";

/// Host port of the shared container, set on first use.
static POSTGRES_PORT: OnceLock<u16> = OnceLock::new();

fn postgres_port() -> u16 {
    *POSTGRES_PORT.get_or_init(|| {
        // Allow pointing the suite at an already-running server (e.g. when no
        // Docker daemon is available) instead of starting a container.
        if let Ok(port) = std::env::var("PG_CONVERGE_TEST_PORT") {
            return port
                .parse()
                .expect("PG_CONVERGE_TEST_PORT must be a port number");
        }

        // Dedicated tokio runtime for container management
        let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

        let port = rt.block_on(async {
            let container = Postgres::default()
                .start()
                .await
                .expect("failed to start postgres container");

            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("failed to get postgres port");

            // Leak the container to keep it alive for the test duration
            std::mem::forget(container);

            port
        });

        // Keep the runtime alive with the container
        std::mem::forget(rt);

        port
    })
}

fn url_with_db(db: &str) -> String {
    format!(
        "postgres://{}:{}@127.0.0.1:{}/{}",
        PG_USER,
        PG_PASSWORD,
        postgres_port(),
        db
    )
}

/// Create a fresh, uniquely named database on the shared container and return
/// a client connected to it. pgcrypto is pre-enabled so tests can use
/// `gen_random_uuid()` in fixtures.
pub fn fresh_client() -> Client {
    let mut admin =
        Client::connect(&url_with_db(PG_DB), NoTls).expect("failed to connect as admin");

    // PostgreSQL identifiers are case-insensitive, so lowercase is fine
    let db_name = format!("test_{}", Uuid::new_v4().simple());
    admin
        .execute(&format!("CREATE DATABASE \"{}\"", db_name), &[])
        .expect("failed to create test database");
    drop(admin);

    let mut client =
        Client::connect(&url_with_db(&db_name), NoTls).expect("failed to connect to test database");
    client
        .batch_execute("CREATE EXTENSION IF NOT EXISTS \"pgcrypto\"")
        .expect("failed to enable pgcrypto");
    client
}
