//! Booking service: the seat-hold and booking-lifecycle entry points.

use chrono::{DateTime, Duration, Utc};
use common::AggregateId;
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::catalog::{Catalog, CatalogError, ScreeningInfo};
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::loyalty::LoyaltyService;
use crate::seating::{ScreeningSeating, SeatingError, SeatingEvent};

use super::{
    Booking, BookingError, CancelBooking, ComboLine, ConfirmPayment, HoldSeats, RedeemPoints,
    RefundBooking, ScreeningRef, SetCombos,
};

/// How many times a hold retries after losing an append race before the
/// caller is told the seats are gone.
pub const MAX_HOLD_ATTEMPTS: usize = 3;

/// Service for seat holds and the booking lifecycle.
///
/// Coordinates the two aggregates of the reservation path: seats are
/// claimed on the screening's seating aggregate first, then the booking is
/// created over them. A failure after a successful claim releases the
/// seats again, so the pair behaves all-or-nothing.
pub struct BookingService<S, C, L>
where
    S: EventStore,
    C: Catalog,
    L: LoyaltyService,
{
    bookings: CommandHandler<S, Booking>,
    seating: CommandHandler<S, ScreeningSeating>,
    catalog: C,
    loyalty: L,
    hold_duration: Duration,
}

impl<S, C, L> BookingService<S, C, L>
where
    S: EventStore + Clone,
    C: Catalog,
    L: LoyaltyService,
{
    /// Creates a new booking service.
    pub fn new(store: S, catalog: C, loyalty: L, hold_duration: Duration) -> Self {
        Self {
            bookings: CommandHandler::new(store.clone()),
            seating: CommandHandler::new(store),
            catalog,
            loyalty,
            hold_duration,
        }
    }

    /// Returns the configured hold window.
    pub fn hold_duration(&self) -> Duration {
        self.hold_duration
    }

    /// Holds seats and creates the booking in one all-or-nothing operation.
    #[tracing::instrument(skip(self, cmd), fields(screening_id = %cmd.screening_id, seats = cmd.seat_ids.len()))]
    pub async fn hold_seats(
        &self,
        cmd: HoldSeats,
        now: DateTime<Utc>,
    ) -> Result<CommandResult<Booking>, DomainError> {
        metrics::counter!("booking_hold_attempts_total").increment(1);

        let screening = self.catalog.screening(cmd.screening_id).await?;
        if screening.movie_archived {
            return Err(CatalogError::MovieArchived(cmd.screening_id).into());
        }

        if cmd.seat_ids.is_empty() || cmd.seat_ids.len() > 8 {
            return Err(BookingError::InvalidSeatCount {
                count: cmd.seat_ids.len(),
            }
            .into());
        }

        for (i, seat_id) in cmd.seat_ids.iter().enumerate() {
            if cmd.seat_ids[..i].contains(seat_id) {
                return Err(BookingError::DuplicateSeat {
                    seat_id: seat_id.clone(),
                }
                .into());
            }
            if screening.seat(seat_id).is_none() {
                return Err(SeatingError::UnknownSeat {
                    seat_id: seat_id.clone(),
                }
                .into());
            }
        }

        let seating_id = cmd.screening_id.seating_aggregate();
        self.ensure_seating_open(&screening).await?;

        let expires_at = now + self.hold_duration;

        // The hold command re-validates availability and the orphan rule on
        // every attempt; a lost append race just means another hold landed
        // first, so reload and try again a bounded number of times.
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .seating
                .execute(seating_id, |seating| {
                    seating.hold(cmd.booking_id, &cmd.seat_ids, expires_at)
                })
                .await;

            match result {
                Ok(_) => break,
                Err(e) if e.is_concurrency_conflict() && attempt < MAX_HOLD_ATTEMPTS => {
                    metrics::counter!("booking_hold_retries_total").increment(1);
                    continue;
                }
                Err(e) if e.is_concurrency_conflict() => {
                    return Err(SeatingError::SeatsUnavailable {
                        seats: cmd.seat_ids.clone(),
                    }
                    .into());
                }
                Err(e) => return Err(e),
            }
        }

        let mut seats = Vec::with_capacity(cmd.seat_ids.len());
        for seat_id in &cmd.seat_ids {
            // Validated above; holding cannot remove a seat from the layout.
            if let Some(spec) = screening.seat(seat_id) {
                let price = self
                    .catalog
                    .seat_price(spec.seat_type, screening.starts_at)
                    .await;
                seats.push(super::BookedSeat {
                    seat_id: spec.seat_id.clone(),
                    row: spec.row.clone(),
                    number: spec.number,
                    seat_type: spec.seat_type,
                    price,
                });
            }
        }

        let screening_ref = ScreeningRef {
            screening_id: screening.screening_id,
            cinema_id: screening.cinema_id,
            movie_id: screening.movie_id,
            starts_at: screening.starts_at,
            ends_at: screening.ends_at,
        };

        let created = self
            .bookings
            .execute(cmd.booking_id, |booking| {
                booking.create(
                    cmd.booking_id,
                    screening_ref,
                    cmd.customer,
                    seats.clone(),
                    expires_at,
                    now,
                )
            })
            .await;

        match created {
            Ok(result) => {
                metrics::counter!("booking_holds_total").increment(1);
                Ok(result)
            }
            Err(e) => {
                // All-or-nothing: the claim must not outlive the failed
                // booking creation.
                if let Err(release_err) = self.release_seats(seating_id, cmd.booking_id).await {
                    tracing::error!(
                        booking_id = %cmd.booking_id,
                        error = %release_err,
                        "failed to release seats after booking creation failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Replaces a booking's combo line items.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn set_combos(
        &self,
        cmd: SetCombos,
        now: DateTime<Utc>,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let mut lines = Vec::with_capacity(cmd.selections.len());
        for selection in &cmd.selections {
            let combo = self.catalog.combo(&selection.combo_id).await?;
            lines.push(ComboLine::new(
                combo.combo_id,
                combo.name,
                selection.quantity,
                combo.unit_price,
            ));
        }

        self.bookings
            .execute(cmd.booking_id, |booking| booking.set_combos(lines, now))
            .await
    }

    /// Redeems loyalty points against a held booking.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id, points = cmd.points))]
    pub async fn redeem_points(
        &self,
        cmd: RedeemPoints,
        now: DateTime<Utc>,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let booking = self
            .get_booking(cmd.booking_id)
            .await?
            .ok_or(DomainError::AggregateNotFound {
                aggregate_type: "Booking",
                aggregate_id: cmd.booking_id.to_string(),
            })?;

        let customer = booking.customer().ok_or(BookingError::GuestCannotRedeem)?;
        let balance = self.loyalty.point_balance(customer).await?;

        self.bookings
            .execute(cmd.booking_id, |booking| {
                booking.redeem_points(cmd.points, balance, now)
            })
            .await
    }

    /// Cancels a held booking and synchronously releases its seats.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn cancel(
        &self,
        cmd: CancelBooking,
        now: DateTime<Utc>,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let result = self
            .bookings
            .execute(cmd.booking_id, |booking| booking.cancel(now))
            .await?;

        self.release_for(&result.aggregate, cmd.booking_id).await?;
        metrics::counter!("booking_cancellations_total").increment(1);

        Ok(result)
    }

    /// Confirms a settled payment: booking Paid, seats Sold.
    ///
    /// Only the settlement path calls this, after the gateway reported
    /// success and the idempotency fence was claimed.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn confirm_payment(
        &self,
        cmd: ConfirmPayment,
        now: DateTime<Utc>,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let result = self
            .bookings
            .execute(cmd.booking_id, |booking| {
                booking.confirm_payment(cmd.payment_id, now)
            })
            .await?;

        if let Some(screening) = result.aggregate.screening() {
            let seating_id = screening.screening_id.seating_aggregate();
            self.seating_execute_retry(seating_id, |seating| seating.sell(cmd.booking_id))
                .await?;
        }

        Ok(result)
    }

    /// Refunds a paid booking and releases its seats.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn refund(
        &self,
        cmd: RefundBooking,
        now: DateTime<Utc>,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let result = self
            .bookings
            .execute(cmd.booking_id, |booking| booking.refund(now))
            .await?;

        self.release_for(&result.aggregate, cmd.booking_id).await?;

        Ok(result)
    }

    /// Expires a lapsed hold and releases its seats.
    ///
    /// Used by the sweeper; the expire command re-validates "still Hold and
    /// still lapsed" against freshly loaded state.
    #[tracing::instrument(skip(self))]
    pub async fn expire(
        &self,
        booking_id: AggregateId,
        now: DateTime<Utc>,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let result = self
            .bookings
            .execute(booking_id, |booking| booking.expire(now))
            .await?;

        self.release_for(&result.aggregate, booking_id).await?;

        Ok(result)
    }

    /// Loads a booking by ID.
    ///
    /// Returns None if the booking doesn't exist.
    pub async fn get_booking(
        &self,
        booking_id: AggregateId,
    ) -> Result<Option<Booking>, DomainError> {
        self.bookings.load_existing(booking_id).await
    }

    /// Loads the seat map of a screening.
    ///
    /// Returns None if seating was never opened for the screening.
    pub async fn seat_map(
        &self,
        screening_id: common::ScreeningId,
    ) -> Result<Option<ScreeningSeating>, DomainError> {
        self.seating
            .load_existing(screening_id.seating_aggregate())
            .await
    }

    /// Opens the seating aggregate from the catalog layout if needed.
    ///
    /// Losing the open race to a concurrent request is fine: the inventory
    /// exists either way.
    async fn ensure_seating_open(&self, screening: &ScreeningInfo) -> Result<(), DomainError> {
        let seating_id = screening.screening_id.seating_aggregate();
        let existing = self.seating.load(seating_id).await?;
        if existing.id().is_some() {
            return Ok(());
        }

        let screening_id = screening.screening_id;
        let layout = screening.seats.clone();
        match self
            .seating
            .execute(seating_id, |seating| seating.open(screening_id, layout))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_concurrency_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Releases a booking's seats on the seating aggregate of its screening.
    async fn release_for(
        &self,
        booking: &Booking,
        booking_id: AggregateId,
    ) -> Result<(), DomainError> {
        if let Some(screening) = booking.screening() {
            let seating_id = screening.screening_id.seating_aggregate();
            self.release_seats(seating_id, booking_id).await?;
        }
        Ok(())
    }

    async fn release_seats(
        &self,
        seating_id: AggregateId,
        booking_id: AggregateId,
    ) -> Result<(), DomainError> {
        self.seating_execute_retry(seating_id, |seating| seating.release(booking_id))
            .await?;
        Ok(())
    }

    /// Runs a seating command, retrying bounded times on append races.
    ///
    /// Releases and sales are idempotent, so replaying the command against
    /// reloaded state is safe.
    async fn seating_execute_retry<F>(
        &self,
        seating_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<ScreeningSeating>, DomainError>
    where
        F: Fn(&ScreeningSeating) -> Result<Vec<SeatingEvent>, SeatingError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .seating
                .execute(seating_id, |seating| command_fn(seating))
                .await
            {
                Ok(result) => return Ok(result),
                Err(e) if e.is_concurrency_conflict() && attempt < MAX_HOLD_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
