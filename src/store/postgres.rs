//! PostgreSQL trip store.
//!
//! Bulk transfer binds each column of a batch as an array and expands them
//! with UNNEST inside a single transaction. The fallback path inserts one row
//! per transaction.

use crate::models::CanonicalRecord;
use crate::store::{StoreError, TripColumns, TripStore};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgPool, Postgres};

const BULK_INSERT_TRIPS: &str = r#"INSERT INTO trips (
        tpep_pickup_datetime, tpep_dropoff_datetime, passenger_count, trip_distance,
        store_and_fwd_flag, "PULocationID", "DOLocationID", fare_amount, tip_amount
       )
       SELECT * FROM UNNEST(
           $1::timestamptz[],
           $2::timestamptz[],
           $3::smallint[],
           $4::numeric[],
           $5::text[],
           $6::int[],
           $7::int[],
           $8::numeric[],
           $9::numeric[]
       )"#;

const INSERT_TRIP: &str = r#"INSERT INTO trips (
        tpep_pickup_datetime, tpep_dropoff_datetime, passenger_count, trip_distance,
        store_and_fwd_flag, "PULocationID", "DOLocationID", fare_amount, tip_amount
       )
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#;

/// Trip store holding one pooled connection for the whole run.
pub struct PgTripStore {
    conn: PoolConnection<Postgres>,
}

impl PgTripStore {
    /// Acquire the connection the run will use for every batch.
    pub async fn acquire(pool: &PgPool) -> Result<Self, StoreError> {
        let conn = pool.acquire().await?;
        Ok(Self { conn })
    }

    /// Number of rows currently in the `trips` table.
    pub async fn count(&mut self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trips")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}

impl TripStore for PgTripStore {
    async fn bulk_insert(&mut self, batch: &[CanonicalRecord]) -> Result<usize, StoreError> {
        let data = TripColumns::from_records(batch);
        if data.is_empty() {
            return Ok(0);
        }
        let mut tx = self.conn.begin().await?;

        let result = sqlx::query(BULK_INSERT_TRIPS)
            .bind(&data.pickup_datetimes)
            .bind(&data.dropoff_datetimes)
            .bind(&data.passenger_counts)
            .bind(&data.trip_distances)
            .bind(&data.store_and_fwd_flags)
            .bind(&data.pu_location_ids)
            .bind(&data.do_location_ids)
            .bind(&data.fare_amounts)
            .bind(&data.tip_amounts)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let rows_affected = result.rows_affected() as usize;
        log::trace!("bulk inserted {} trips", rows_affected);
        Ok(rows_affected)
    }

    async fn insert_one(&mut self, record: &CanonicalRecord) -> Result<(), StoreError> {
        // Dropping the transaction on error rolls it back.
        let mut tx = self.conn.begin().await?;

        sqlx::query(INSERT_TRIP)
            .bind(record.pickup_datetime)
            .bind(record.dropoff_datetime)
            .bind(record.passenger_count)
            .bind(record.trip_distance)
            .bind(record.store_and_fwd_flag.as_str())
            .bind(record.pu_location_id)
            .bind(record.do_location_id)
            .bind(record.fare_amount)
            .bind(record.tip_amount)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
