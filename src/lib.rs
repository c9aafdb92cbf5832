pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod store;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Initialize the logger once, keeping sqlx statement logging quiet.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn")).init();
    });
}

pub mod test_support {
    use crate::models::{CanonicalRecord, columns};
    use crate::store::{StoreError, TripStore};
    use rust_decimal::{Decimal, RoundingStrategy};

    pub use database::{TestDatabase, TestDatabaseError};

    /// In-memory trip store that enforces the `trips` column contract.
    ///
    /// Numeric columns overflow the way PostgreSQL `numeric(p, 2)` does, and a
    /// bulk insert is all-or-nothing, so tests can drive the loader's fallback
    /// path with ordinary bad data.
    #[derive(Debug, Default)]
    pub struct MemoryTripStore {
        rows: Vec<CanonicalRecord>,
        bulk_calls: usize,
        single_calls: usize,
        bulk_unavailable: bool,
        layout_fault: Option<String>,
    }

    impl MemoryTripStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every bulk transfer fail as if the bulk path were down.
        pub fn with_bulk_unavailable(mut self) -> Self {
            self.bulk_unavailable = true;
            self
        }

        /// Make every operation fail with a column-mapping fault.
        pub fn with_layout_fault(mut self, message: &str) -> Self {
            self.layout_fault = Some(message.to_string());
            self
        }

        pub fn rows(&self) -> &[CanonicalRecord] {
            &self.rows
        }

        pub fn bulk_calls(&self) -> usize {
            self.bulk_calls
        }

        pub fn single_calls(&self) -> usize {
            self.single_calls
        }

        fn check(&self, record: &CanonicalRecord) -> Result<(), StoreError> {
            if let Some(message) = &self.layout_fault {
                return Err(StoreError::Layout(message.clone()));
            }
            check_precision(columns::TRIP_DISTANCE, record.trip_distance, 4)?;
            check_precision(columns::FARE_AMOUNT, record.fare_amount, 8)?;
            check_precision(columns::TIP_AMOUNT, record.tip_amount, 8)?;
            Ok(())
        }
    }

    fn check_precision(
        column: &'static str,
        value: Decimal,
        integer_digits: u32,
    ) -> Result<(), StoreError> {
        let limit = Decimal::from(10_i64.pow(integer_digits));
        let stored = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if stored.abs() >= limit {
            return Err(StoreError::Column {
                column,
                reason: format!("numeric field overflow for {}", value),
            });
        }
        Ok(())
    }

    impl TripStore for MemoryTripStore {
        async fn bulk_insert(&mut self, batch: &[CanonicalRecord]) -> Result<usize, StoreError> {
            self.bulk_calls += 1;
            if let Some(message) = &self.layout_fault {
                return Err(StoreError::Layout(message.clone()));
            }
            if self.bulk_unavailable {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            for record in batch {
                self.check(record)?;
            }
            self.rows.extend_from_slice(batch);
            Ok(batch.len())
        }

        async fn insert_one(&mut self, record: &CanonicalRecord) -> Result<(), StoreError> {
            self.single_calls += 1;
            self.check(record)?;
            self.rows.push(record.clone());
            Ok(())
        }
    }

    pub mod database {
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{ConnectOptions, PgPool};
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, ImageExt, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        use crate::store::migration::MIGRATOR;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Use `TEST_DATABASE_URL` when set, otherwise launch a disposable
            /// Postgres container.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                match std::env::var("TEST_DATABASE_URL") {
                    Ok(url) => Self::with_admin_url(&url, None).await,
                    Err(_) => Self::new().await,
                }
            }

            /// Provision a fresh database inside a new container.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().with_tag("16-alpine").start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                Self::with_admin_url(&admin_url, Some(container)).await
            }

            async fn with_admin_url(
                admin_url: &str,
                container: Option<ContainerAsync<Postgres>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions = admin_url.parse()?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql).execute(&admin_pool).await?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(2)
                    .connect_with(base_options.clone().database(&new_db_name))
                    .await?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_name: new_db_name,
                    container,
                })
            }

            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ = drop_database_with_fallback(admin_options, &db_name).await;
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }
}
