use sqlx::PgPool;
use uuid::Uuid;

use super::repo;
use crate::{
    auth::AuthUser,
    db::{Booking, UserType},
    providers,
};

/// Which bookings a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Customer(Uuid),
    Provider(Uuid),
    All,
    /// Signed in but without a customer or provider profile.
    Nothing,
}

impl Scope {
    pub async fn resolve(db: &PgPool, auth: &AuthUser) -> sqlx::Result<Self> {
        Ok(match auth.role {
            UserType::Admin => Self::All,
            UserType::Customer => repo::find_customer_by_user(db, auth.id)
                .await?
                .map_or(Self::Nothing, |c| Self::Customer(c.id)),
            UserType::Provider => providers::repo::find_by_user_id(db, auth.id)
                .await?
                .map_or(Self::Nothing, |p| Self::Provider(p.id)),
        })
    }

    /// `(customer_id, provider_id)` filters; `None` means nothing is visible.
    pub fn filters(self) -> Option<(Option<Uuid>, Option<Uuid>)> {
        match self {
            Self::Customer(id) => Some((Some(id), None)),
            Self::Provider(id) => Some((None, Some(id))),
            Self::All => Some((None, None)),
            Self::Nothing => None,
        }
    }

    pub fn can_view(&self, booking: &Booking) -> bool {
        match self {
            Self::Customer(id) => booking.customer_id == *id,
            Self::Provider(id) => booking.provider_id == *id,
            Self::All => true,
            Self::Nothing => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BookingStatus;
    use time::OffsetDateTime;

    fn booking(customer_id: Uuid, provider_id: Uuid) -> Booking {
        let now = OffsetDateTime::now_utc();
        Booking {
            id: Uuid::new_v4(),
            customer_id,
            provider_id,
            service_id: Uuid::new_v4(),
            status: BookingStatus::Pending,
            scheduled_date: now,
            scheduled_time: Some("10:00 AM".into()),
            notes: None,
            total_price: Some(80.0),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn visibility_follows_role() {
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());
        let b = booking(customer, provider);

        assert!(Scope::Customer(customer).can_view(&b));
        assert!(!Scope::Customer(Uuid::new_v4()).can_view(&b));
        assert!(Scope::Provider(provider).can_view(&b));
        assert!(!Scope::Provider(customer).can_view(&b));
        assert!(Scope::All.can_view(&b));
        assert!(!Scope::Nothing.can_view(&b));
    }

    #[test]
    fn nothing_scope_has_no_filters() {
        let id = Uuid::new_v4();
        assert_eq!(Scope::Customer(id).filters(), Some((Some(id), None)));
        assert_eq!(Scope::All.filters(), Some((None, None)));
        assert_eq!(Scope::Nothing.filters(), None);
    }
}
