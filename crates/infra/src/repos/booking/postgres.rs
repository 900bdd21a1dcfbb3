use super::IBookingRepo;
use sqlx::types::{Json, Uuid};
use sqlx::{FromRow, PgPool};
use varsel_domain::{Booking, BookingStatus, ReminderState, ReminderStatePatch, ID};

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BookingRaw {
    booking_uid: Uuid,
    event_time: i64,
    recipient_uid: Uuid,
    recipient_email: Option<String>,
    status: String,
    reminder_state: Json<ReminderState>,
}

impl From<BookingRaw> for Booking {
    fn from(raw: BookingRaw) -> Self {
        Self {
            id: raw.booking_uid.into(),
            event_time: raw.event_time,
            recipient: raw.recipient_uid.into(),
            recipient_email: raw.recipient_email,
            status: raw
                .status
                .parse::<BookingStatus>()
                .unwrap_or(BookingStatus::Pending),
            reminder_state: raw.reminder_state.0,
        }
    }
}

#[async_trait::async_trait]
impl IBookingRepo for PostgresBookingRepo {
    async fn insert(&self, booking: &Booking) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings
            (booking_uid, event_time, recipient_uid, recipient_email, status, reminder_state)
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(booking.id.inner_ref())
        .bind(booking.event_time)
        .bind(booking.recipient.inner_ref())
        .bind(&booking.recipient_email)
        .bind(booking.status.to_string())
        .bind(Json(&booking.reminder_state))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, booking_id: &ID) -> Option<Booking> {
        sqlx::query_as::<_, BookingRaw>(
            r#"
            SELECT * FROM bookings AS b
            WHERE b.booking_uid = $1
            "#,
        )
        .bind(booking_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()
        .flatten()
        .map(|booking| booking.into())
    }

    async fn find_confirmed_in_window(&self, from: i64, to: i64) -> anyhow::Result<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, BookingRaw>(
            r#"
            SELECT * FROM bookings AS b
            WHERE b.status = 'confirmed' AND
            b.event_time >= $1 AND b.event_time <= $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings.into_iter().map(|booking| booking.into()).collect())
    }

    async fn update_reminder_state(
        &self,
        booking_id: &ID,
        offset_label: &str,
        patch: &ReminderStatePatch,
    ) -> anyhow::Result<()> {
        // Merge the patch into the offsets entry only. Fields absent
        // from the patch are not serialized and therefore untouched.
        sqlx::query(
            r#"
            UPDATE bookings AS b
            SET reminder_state = jsonb_set(
                b.reminder_state,
                ARRAY[$2],
                COALESCE(b.reminder_state -> $2, '{"scheduled_at":null,"sent_at":null}'::jsonb) || $3,
                TRUE
            )
            WHERE b.booking_uid = $1
            "#,
        )
        .bind(booking_id.inner_ref())
        .bind(offset_label)
        .bind(Json(patch))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
