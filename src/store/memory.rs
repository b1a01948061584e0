use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::Store;
use crate::arbitration::{settle, Settlement};
use crate::entities::{
    Application, ApplicationStatus, Booking, BookingStatus, Notification, Profile, Transaction,
};
use crate::error::{
    duplicate_application_error, invalid_state_error, not_found_error, profile_exists_error,
    store_unavailable_error, Error,
};

#[derive(Debug, Default)]
struct Tables {
    bookings: HashMap<String, Booking>,
    applications: HashMap<String, Application>,
    notifications: HashMap<String, Notification>,
    transactions: HashMap<String, Transaction>,
    profiles: HashMap<String, Profile>,
}

/// In-process store. One lock guards every table, so each call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail with `StoreUnavailable`.
    pub fn inject_unavailable(&self, count: usize) {
        self.unavailable.store(count, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), Error> {
        let outage = self
            .unavailable
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        match outage {
            Ok(_) => Err(store_unavailable_error()),
            Err(_) => Ok(()),
        }
    }
}

fn newest_first<T, F>(mut records: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    records.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    records
}

fn oldest_first(mut applications: Vec<Application>) -> Vec<Application> {
    applications.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    applications
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        tables.bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn fetch_booking(&self, id: &str) -> Result<Booking, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        tables.bookings.get(id).cloned().ok_or_else(not_found_error)
    }

    async fn bookings_by_rider(&self, rider_id: &str) -> Result<Vec<Booking>, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        let bookings = tables
            .bookings
            .values()
            .filter(|booking| booking.rider_id == rider_id)
            .cloned()
            .collect();

        Ok(newest_first(bookings, |booking: &Booking| booking.created_at))
    }

    async fn open_bookings(&self) -> Result<Vec<Booking>, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        let bookings = tables
            .bookings
            .values()
            .filter(|booking| booking.is_open())
            .cloned()
            .collect();

        Ok(newest_first(bookings, |booking: &Booking| booking.created_at))
    }

    async fn transition_booking(
        &self,
        id: &str,
        expected: BookingStatus,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let stored = tables.bookings.get_mut(id).ok_or_else(not_found_error)?;
        if stored.status != expected {
            return Err(invalid_state_error());
        }

        let mut booking = stored.clone();
        booking.transition(status, now)?;

        *stored = booking.clone();
        Ok(booking)
    }

    async fn delete_booking(&self, id: &str) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let booking = tables.bookings.get(id).ok_or_else(not_found_error)?;
        if !booking.is_pending() {
            return Err(invalid_state_error());
        }

        tables.bookings.remove(id);
        tables
            .applications
            .retain(|_, application| application.booking_id != id);
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &Application,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let mut booking = tables
            .bookings
            .get(&application.booking_id)
            .cloned()
            .ok_or_else(not_found_error)?;

        booking.receive_application(now)?;

        if tables.applications.contains_key(&application.id) {
            return Err(duplicate_application_error());
        }

        tables
            .applications
            .insert(application.id.clone(), application.clone());
        tables.bookings.insert(booking.id.clone(), booking);
        Ok(())
    }

    async fn fetch_application(&self, id: &str) -> Result<Application, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        tables.applications.get(id).cloned().ok_or_else(not_found_error)
    }

    async fn applications_by_booking(&self, booking_id: &str) -> Result<Vec<Application>, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        Ok(oldest_first(
            tables
                .applications
                .values()
                .filter(|application| application.booking_id == booking_id)
                .cloned()
                .collect(),
        ))
    }

    async fn applications_by_vendor(&self, vendor_id: &str) -> Result<Vec<Application>, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        Ok(oldest_first(
            tables
                .applications
                .values()
                .filter(|application| application.vendor_id == vendor_id)
                .cloned()
                .collect(),
        ))
    }

    async fn update_application(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let stored = tables
            .applications
            .get_mut(&application.id)
            .ok_or_else(not_found_error)?;
        if stored.status != expected {
            return Err(invalid_state_error());
        }

        *stored = application.clone();
        Ok(())
    }

    async fn delete_application(&self, id: &str) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let application = tables.applications.get(id).ok_or_else(not_found_error)?;
        application.ensure_withdrawable()?;

        tables.applications.remove(id);
        Ok(())
    }

    async fn settle_booking(
        &self,
        booking_id: &str,
        application_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Settlement, Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let booking = tables
            .bookings
            .get(booking_id)
            .cloned()
            .ok_or_else(not_found_error)?;

        let applications = tables
            .applications
            .values()
            .filter(|application| application.booking_id == booking_id)
            .cloned()
            .collect();

        let settlement = settle(booking, applications, application_id, now)?;

        tables
            .bookings
            .insert(settlement.booking.id.clone(), settlement.booking.clone());
        for application in std::iter::once(&settlement.accepted).chain(&settlement.rejected) {
            tables
                .applications
                .insert(application.id.clone(), application.clone());
        }
        tables.notifications.insert(
            settlement.notification.id.clone(),
            settlement.notification.clone(),
        );

        Ok(settlement)
    }

    async fn append_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        tables
            .notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn fetch_notification(&self, id: &str) -> Result<Notification, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        tables.notifications.get(id).cloned().ok_or_else(not_found_error)
    }

    async fn notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        let notifications = tables
            .notifications
            .values()
            .filter(|notification| notification.recipient_id == recipient_id)
            .cloned()
            .collect();

        Ok(newest_first(notifications, |notification: &Notification| {
            notification.created_at
        }))
    }

    async fn update_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let stored = tables
            .notifications
            .get_mut(&notification.id)
            .ok_or_else(not_found_error)?;

        *stored = notification.clone();
        Ok(())
    }

    async fn insert_transaction(
        &self,
        transaction: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<Application, Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let mut application = tables
            .applications
            .get(&transaction.application_id)
            .cloned()
            .ok_or_else(not_found_error)?;

        application.mark_paid(transaction.id.clone(), now)?;

        tables
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        tables
            .applications
            .insert(application.id.clone(), application.clone());

        Ok(application)
    }

    async fn transaction_for_application(
        &self,
        application_id: &str,
    ) -> Result<Option<Transaction>, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        Ok(tables
            .transactions
            .values()
            .find(|transaction| transaction.application_id == application_id)
            .cloned())
    }

    async fn transactions_by_account(&self, account_id: &str) -> Result<Vec<Transaction>, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        let transactions = tables
            .transactions
            .values()
            .filter(|transaction| transaction.involves(account_id))
            .cloned()
            .collect();

        Ok(newest_first(transactions, |transaction: &Transaction| {
            transaction.created_at
        }))
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        if tables.profiles.contains_key(&profile.id) {
            return Err(profile_exists_error());
        }

        tables.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn fetch_profile(&self, id: &str) -> Result<Profile, Error> {
        self.check_available()?;
        let tables = self.tables.lock().await;

        tables.profiles.get(id).cloned().ok_or_else(not_found_error)
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), Error> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let stored = tables
            .profiles
            .get_mut(&profile.id)
            .ok_or_else(not_found_error)?;

        *stored = profile.clone();
        Ok(())
    }
}
