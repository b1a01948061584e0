use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    Executor, Pool, Postgres, Row, Transaction,
};

use super::Store;
use crate::arbitration::{settle, Settlement};
use crate::entities::{
    Application, ApplicationStatus, Booking, BookingStatus, Notification, Profile,
    Transaction as Payment,
};
use crate::error::{
    duplicate_application_error, invalid_state_error, not_found_error, profile_exists_error, Error,
};

type Database = Postgres;

/// PostgreSQL store. Records are JSONB documents next to the columns used
/// for lookups and compare-and-swap checks.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool<Database>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::connect", skip(db_uri))]
    pub async fn connect(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        Self::new(pool).await
    }

    #[tracing::instrument(name = "PgStore::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        pool.execute("CREATE TABLE IF NOT EXISTS bookings (id VARCHAR PRIMARY KEY, rider_id VARCHAR NOT NULL, status VARCHAR NOT NULL, vendor_id VARCHAR, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS bookings_rider_idx ON bookings (rider_id)")
            .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS bookings_status_idx ON bookings (status)")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS applications (id VARCHAR PRIMARY KEY, booking_id VARCHAR NOT NULL, vendor_id VARCHAR NOT NULL, status VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL, CONSTRAINT fk_application_booking FOREIGN KEY(booking_id) REFERENCES bookings(id) ON DELETE CASCADE)")
            .await?;
        pool.execute(
            "CREATE INDEX IF NOT EXISTS applications_booking_idx ON applications (booking_id)",
        )
        .await?;
        pool.execute(
            "CREATE INDEX IF NOT EXISTS applications_vendor_idx ON applications (vendor_id)",
        )
        .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS notifications (id VARCHAR PRIMARY KEY, recipient_id VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute(
            "CREATE INDEX IF NOT EXISTS notifications_recipient_idx ON notifications (recipient_id)",
        )
        .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS profiles (id VARCHAR PRIMARY KEY, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS transactions (id VARCHAR PRIMARY KEY, application_id VARCHAR NOT NULL UNIQUE, rider_id VARCHAR NOT NULL, vendor_id VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL, CONSTRAINT fk_transaction_application FOREIGN KEY(application_id) REFERENCES applications(id))")
            .await?;

        Ok(Self { pool })
    }

    /// Distinguishes a missing record from one whose status moved on after a
    /// compare-and-swap write matched no rows.
    async fn missing_or_conflict(&self, table: &'static str, id: &str) -> Error {
        let query = format!("SELECT 1 FROM {table} WHERE id = $1");

        match self.pool.fetch_optional(sqlx::query(&query).bind(id)).await {
            Ok(Some(_)) => invalid_state_error(),
            Ok(None) => not_found_error(),
            Err(err) => err.into(),
        }
    }
}

fn decode<T: DeserializeOwned>(row: &PgRow) -> Result<T, Error> {
    let Json(value): Json<T> = row.try_get("data")?;
    Ok(value)
}

fn decode_all<T: DeserializeOwned>(rows: Vec<PgRow>) -> Result<Vec<T>, Error> {
    rows.iter().map(decode).collect()
}

/// Maps a unique-key violation to `duplicate`, anything else as usual.
fn unique_violation_as(duplicate: fn() -> Error) -> impl Fn(sqlx::Error) -> Error {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return duplicate();
            }
        }

        err.into()
    }
}

#[tracing::instrument(skip(tx))]
async fn fetch_booking_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &str,
) -> Result<Booking, Error> {
    let row = tx
        .fetch_optional(sqlx::query("SELECT data FROM bookings WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(not_found_error)?;

    decode(&row)
}

#[tracing::instrument(skip(tx))]
async fn fetch_application_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &str,
) -> Result<Application, Error> {
    let row = tx
        .fetch_optional(
            sqlx::query("SELECT data FROM applications WHERE id = $1 FOR UPDATE").bind(id),
        )
        .await?
        .ok_or_else(not_found_error)?;

    decode(&row)
}

#[tracing::instrument(skip(tx))]
async fn fetch_applications_for_update(
    tx: &mut Transaction<'_, Database>,
    booking_id: &str,
) -> Result<Vec<Application>, Error> {
    let rows = tx
        .fetch_all(
            sqlx::query("SELECT data FROM applications WHERE booking_id = $1 FOR UPDATE")
                .bind(booking_id),
        )
        .await?;

    decode_all(rows)
}

#[tracing::instrument(skip(tx, booking), fields(booking_id = %booking.id))]
async fn write_booking(tx: &mut Transaction<'_, Database>, booking: &Booking) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE bookings SET status = $2, vendor_id = $3, data = $4 WHERE id = $1")
            .bind(&booking.id)
            .bind(booking.status.name())
            .bind(&booking.vendor_id)
            .bind(Json(booking)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx, application), fields(application_id = %application.id))]
async fn write_application(
    tx: &mut Transaction<'_, Database>,
    application: &Application,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE applications SET status = $2, data = $3 WHERE id = $1")
            .bind(&application.id)
            .bind(application.status.name())
            .bind(Json(application)),
    )
    .await?;

    Ok(())
}

async fn insert_notification<'e, E>(executor: E, notification: &Notification) -> Result<(), Error>
where
    E: Executor<'e, Database = Database>,
{
    executor
        .execute(
            sqlx::query(
                "INSERT INTO notifications (id, recipient_id, created_at, data) VALUES ($1, $2, $3, $4)",
            )
            .bind(&notification.id)
            .bind(&notification.recipient_id)
            .bind(notification.created_at)
            .bind(Json(notification)),
        )
        .await?;

    Ok(())
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO bookings (id, rider_id, status, vendor_id, created_at, data) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(&booking.id)
                .bind(&booking.rider_id)
                .bind(booking.status.name())
                .bind(&booking.vendor_id)
                .bind(booking.created_at)
                .bind(Json(booking)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_booking(&self, id: &str) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;

        let row = conn
            .fetch_optional(sqlx::query("SELECT data FROM bookings WHERE id = $1").bind(id))
            .await?
            .ok_or_else(not_found_error)?;

        decode(&row)
    }

    #[tracing::instrument(skip(self))]
    async fn bookings_by_rider(&self, rider_id: &str) -> Result<Vec<Booking>, Error> {
        let rows = self
            .pool
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM bookings WHERE rider_id = $1 ORDER BY created_at DESC",
                )
                .bind(rider_id),
            )
            .await?;

        decode_all(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn open_bookings(&self) -> Result<Vec<Booking>, Error> {
        let rows = self
            .pool
            .fetch_all(sqlx::query(
                "SELECT data FROM bookings WHERE status = 'pending' AND vendor_id IS NULL ORDER BY created_at DESC",
            ))
            .await?;

        decode_all(rows)
    }

    #[tracing::instrument(skip(self, now))]
    async fn transition_booking(
        &self,
        id: &str,
        expected: BookingStatus,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        let mut tx = self.pool.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, id).await?;
        if booking.status != expected {
            return Err(invalid_state_error());
        }

        booking.transition(status, now)?;
        write_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_booking(&self, id: &str) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        let booking = fetch_booking_for_update(&mut tx, id).await?;

        if !booking.is_pending() {
            return Err(invalid_state_error());
        }

        // applications go with it through ON DELETE CASCADE
        tx.execute(sqlx::query("DELETE FROM bookings WHERE id = $1").bind(id))
            .await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, application), fields(application_id = %application.id))]
    async fn insert_application(
        &self,
        application: &Application,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        // the booking lock serializes applications with arbitration
        let mut booking = fetch_booking_for_update(&mut tx, &application.booking_id).await?;
        booking.receive_application(now)?;

        let existing = tx
            .fetch_optional(
                sqlx::query("SELECT 1 FROM applications WHERE id = $1").bind(&application.id),
            )
            .await?;

        if existing.is_some() {
            tracing::info!("vendor already applied to this booking");
            return Err(duplicate_application_error());
        }

        tx.execute(
            sqlx::query("INSERT INTO applications (id, booking_id, vendor_id, status, created_at, data) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(&application.id)
                .bind(&application.booking_id)
                .bind(&application.vendor_id)
                .bind(application.status.name())
                .bind(application.created_at)
                .bind(Json(application)),
        )
        .await
        .map_err(unique_violation_as(duplicate_application_error))?;

        write_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_application(&self, id: &str) -> Result<Application, Error> {
        let mut conn = self.pool.acquire().await?;

        let row = conn
            .fetch_optional(sqlx::query("SELECT data FROM applications WHERE id = $1").bind(id))
            .await?
            .ok_or_else(not_found_error)?;

        decode(&row)
    }

    #[tracing::instrument(skip(self))]
    async fn applications_by_booking(&self, booking_id: &str) -> Result<Vec<Application>, Error> {
        let rows = self
            .pool
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM applications WHERE booking_id = $1 ORDER BY created_at ASC, id ASC",
                )
                .bind(booking_id),
            )
            .await?;

        decode_all(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn applications_by_vendor(&self, vendor_id: &str) -> Result<Vec<Application>, Error> {
        let rows = self
            .pool
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM applications WHERE vendor_id = $1 ORDER BY created_at ASC, id ASC",
                )
                .bind(vendor_id),
            )
            .await?;

        decode_all(rows)
    }

    #[tracing::instrument(skip(self, application), fields(application_id = %application.id))]
    async fn update_application(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> Result<(), Error> {
        let result = self
            .pool
            .execute(
                sqlx::query(
                    "UPDATE applications SET status = $3, data = $4 WHERE id = $1 AND status = $2",
                )
                .bind(&application.id)
                .bind(expected.name())
                .bind(application.status.name())
                .bind(Json(application)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict("applications", &application.id).await);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_application(&self, id: &str) -> Result<(), Error> {
        let result = self
            .pool
            .execute(
                sqlx::query("DELETE FROM applications WHERE id = $1 AND status = 'pending'")
                    .bind(id),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict("applications", id).await);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, now))]
    async fn settle_booking(
        &self,
        booking_id: &str,
        application_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Settlement, Error> {
        let mut tx = self.pool.begin().await?;

        tracing::info!("locking booking and its applications");
        let booking = fetch_booking_for_update(&mut tx, booking_id).await?;
        let applications = fetch_applications_for_update(&mut tx, booking_id).await?;

        // any error from here on drops the transaction, which rolls it back
        let settlement = settle(booking, applications, application_id, now)?;

        write_booking(&mut tx, &settlement.booking).await?;

        for application in std::iter::once(&settlement.accepted).chain(&settlement.rejected) {
            write_application(&mut tx, application).await?;
        }

        insert_notification(&mut tx, &settlement.notification).await?;

        tx.commit().await?;

        tracing::info!("settlement committed");

        Ok(settlement)
    }

    #[tracing::instrument(skip(self, notification), fields(notification_id = %notification.id))]
    async fn append_notification(&self, notification: &Notification) -> Result<(), Error> {
        insert_notification(&self.pool, notification).await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_notification(&self, id: &str) -> Result<Notification, Error> {
        let mut conn = self.pool.acquire().await?;

        let row = conn
            .fetch_optional(sqlx::query("SELECT data FROM notifications WHERE id = $1").bind(id))
            .await?
            .ok_or_else(not_found_error)?;

        decode(&row)
    }

    #[tracing::instrument(skip(self))]
    async fn notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>, Error> {
        let rows = self
            .pool
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC",
                )
                .bind(recipient_id),
            )
            .await?;

        decode_all(rows)
    }

    #[tracing::instrument(skip(self, notification), fields(notification_id = %notification.id))]
    async fn update_notification(&self, notification: &Notification) -> Result<(), Error> {
        let result = self
            .pool
            .execute(
                sqlx::query("UPDATE notifications SET data = $2 WHERE id = $1")
                    .bind(&notification.id)
                    .bind(Json(notification)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error());
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, transaction, now), fields(transaction_id = %transaction.id))]
    async fn insert_transaction(
        &self,
        transaction: &Payment,
        now: DateTime<Utc>,
    ) -> Result<Application, Error> {
        let mut tx = self.pool.begin().await?;

        let mut application =
            fetch_application_for_update(&mut tx, &transaction.application_id).await?;
        application.mark_paid(transaction.id.clone(), now)?;

        tx.execute(
            sqlx::query("INSERT INTO transactions (id, application_id, rider_id, vendor_id, created_at, data) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(&transaction.id)
                .bind(&transaction.application_id)
                .bind(&transaction.rider_id)
                .bind(&transaction.vendor_id)
                .bind(transaction.created_at)
                .bind(Json(transaction)),
        )
        .await?;

        write_application(&mut tx, &application).await?;

        tx.commit().await?;

        Ok(application)
    }

    #[tracing::instrument(skip(self))]
    async fn transaction_for_application(
        &self,
        application_id: &str,
    ) -> Result<Option<Payment>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM transactions WHERE application_id = $1")
                    .bind(application_id),
            )
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn transactions_by_account(&self, account_id: &str) -> Result<Vec<Payment>, Error> {
        let rows = self
            .pool
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM transactions WHERE rider_id = $1 OR vendor_id = $1 ORDER BY created_at DESC",
                )
                .bind(account_id),
            )
            .await?;

        decode_all(rows)
    }

    #[tracing::instrument(skip(self, profile), fields(profile_id = %profile.id))]
    async fn insert_profile(&self, profile: &Profile) -> Result<(), Error> {
        self.pool
            .execute(
                sqlx::query("INSERT INTO profiles (id, created_at, data) VALUES ($1, $2, $3)")
                    .bind(&profile.id)
                    .bind(profile.created_at)
                    .bind(Json(profile)),
            )
            .await
            .map_err(unique_violation_as(profile_exists_error))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_profile(&self, id: &str) -> Result<Profile, Error> {
        let row = self
            .pool
            .fetch_optional(sqlx::query("SELECT data FROM profiles WHERE id = $1").bind(id))
            .await?
            .ok_or_else(not_found_error)?;

        decode(&row)
    }

    #[tracing::instrument(skip(self, profile), fields(profile_id = %profile.id))]
    async fn update_profile(&self, profile: &Profile) -> Result<(), Error> {
        let result = self
            .pool
            .execute(
                sqlx::query("UPDATE profiles SET data = $2 WHERE id = $1")
                    .bind(&profile.id)
                    .bind(Json(profile)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error());
        }

        Ok(())
    }
}
