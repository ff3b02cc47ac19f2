//! PostgreSQL Repository Implementations
//!
//! All tables live in the `users` schema. Roles are stored as `TEXT[]`
//! codes; the small enums are stored as `SMALLINT` ids.

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{
    AddressId, LoginHistoryId, NotificationId, NotificationPreferenceId, ProfileId, SessionId,
    UserId,
};
use kernel::pagination::PageRequest;
use outbox::OutboxMessage;
use platform::client::DeviceType;
use platform::password::HashedPassword;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::change_set::{ChangeSet, Op};
use crate::domain::entity::{
    Address, LoginHistory, Notification, NotificationPreference, Profile, Session, User,
};
use crate::domain::repository::{
    AddressRepository, LoginHistoryRepository, NotificationPreferenceRepository,
    NotificationRepository, ProfileRepository, SessionRepository, UserRepository,
    UsersUnitOfWork,
};
use crate::domain::value_object::{
    cpf::Cpf,
    email::Email,
    enums::{Gender, LoginProvider, NotificationType, ReferenceType},
    phone::Phone,
    postal_code::PostalCode,
    role::Role,
    state_code::StateCode,
};
use crate::error::{UsersError, UsersResult};

/// PostgreSQL-backed users repository
#[derive(Clone)]
pub struct PgUsersRepository {
    pool: PgPool,
}

impl PgUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const USER_COLUMNS: &str = r#"
    id, email, email_confirmed, password_hash, security_stamp, roles,
    failed_login_count, locked_until, last_login_at,
    created_at, updated_at, deleted_at
"#;

const PROFILE_COLUMNS: &str = r#"
    id, user_id, first_name, last_name, display_name, avatar_url, birth_date,
    gender, cpf, phone, preferred_language, preferred_currency,
    newsletter_subscribed, accepted_terms_at, accepted_privacy_at, version,
    created_at, updated_at, deleted_at
"#;

const ADDRESS_COLUMNS: &str = r#"
    id, user_id, label, recipient_name, street, number, complement,
    neighborhood, city, state, postal_code, country, latitude, longitude,
    ibge_code, is_default, is_billing_address, created_at, updated_at, deleted_at
"#;

const SESSION_COLUMNS: &str = r#"
    id, user_id, refresh_token_hash, device_id, device_name, device_type,
    ip_address, user_agent, country, city, expires_at, revoked_at,
    revoked_reason, last_activity_at, created_at, updated_at
"#;

const NOTIFICATION_COLUMNS: &str = r#"
    id, user_id, title, message, notification_type, reference_type,
    reference_id, action_url, read_at, created_at, updated_at
"#;

const PREFERENCE_COLUMNS: &str = r#"
    id, user_id, email_enabled, push_enabled, sms_enabled, order_updates,
    promotions, price_drops, back_in_stock, newsletter, created_at, updated_at
"#;

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgUsersRepository {
    async fn find_user_by_id(&self, user_id: UserId) -> UsersResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users.users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_user_by_email(&self, email: &Email) -> UsersResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users.users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn email_exists(&self, email: &Email) -> UsersResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users.users WHERE email = $1 AND deleted_at IS NULL)",
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

// ============================================================================
// Profile Repository Implementation
// ============================================================================

impl ProfileRepository for PgUsersRepository {
    async fn find_profile_by_user(&self, user_id: UserId) -> UsersResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users.profiles WHERE user_id = $1 AND deleted_at IS NULL"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProfileRow::into_profile))
    }

    async fn cpf_exists(&self, cpf: &Cpf, exclude_user: Option<UserId>) -> UsersResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users.profiles
                WHERE cpf = $1
                  AND deleted_at IS NULL
                  AND ($2::uuid IS NULL OR user_id <> $2)
            )
            "#,
        )
        .bind(cpf.as_str())
        .bind(exclude_user.map(|id| id.into_uuid()))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

// ============================================================================
// Address Repository Implementation
// ============================================================================

impl AddressRepository for PgUsersRepository {
    async fn list_addresses(&self, user_id: UserId) -> UsersResult<Vec<Address>> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            r#"
            SELECT {ADDRESS_COLUMNS} FROM users.addresses
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY is_default DESC, created_at ASC
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AddressRow::into_address).collect())
    }

    async fn find_address(&self, address_id: AddressId) -> UsersResult<Option<Address>> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM users.addresses WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(address_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AddressRow::into_address))
    }

    async fn count_active_addresses(&self, user_id: UserId) -> UsersResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users.addresses WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgUsersRepository {
    async fn find_session(&self, session_id: SessionId) -> UsersResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM users.sessions WHERE id = $1"
        ))
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn find_session_by_refresh_hash(&self, hash: &str) -> UsersResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM users.sessions WHERE refresh_token_hash = $1"
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn list_active_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> UsersResult<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM users.sessions
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2
            ORDER BY last_activity_at DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SessionRow::into_session).collect())
    }

    async fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> UsersResult<u64> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM users.sessions
            WHERE expires_at < $1
               OR (revoked_at IS NOT NULL AND revoked_at < $1)
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Login History Repository Implementation
// ============================================================================

impl LoginHistoryRepository for PgUsersRepository {
    async fn recent_logins(&self, user_id: UserId, limit: u32) -> UsersResult<Vec<LoginHistory>> {
        let rows = sqlx::query_as::<_, LoginHistoryRow>(
            r#"
            SELECT id, user_id, provider, success, failure_reason, ip_address,
                   user_agent, device_type, created_at
            FROM users.login_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LoginHistoryRow::into_entry).collect())
    }
}

// ============================================================================
// Notification Repository Implementation
// ============================================================================

impl NotificationRepository for PgUsersRepository {
    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageRequest,
    ) -> UsersResult<(Vec<Notification>, u64)> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users.notifications
            WHERE user_id = $1 AND ($2 = FALSE OR read_at IS NULL)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM users.notifications
            WHERE user_id = $1 AND ($2 = FALSE OR read_at IS NULL)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(unread_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((
            rows.into_iter().map(NotificationRow::into_notification).collect(),
            total.max(0) as u64,
        ))
    }

    async fn list_unread_notifications(&self, user_id: UserId) -> UsersResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM users.notifications
            WHERE user_id = $1 AND read_at IS NULL
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(NotificationRow::into_notification).collect())
    }

    async fn count_unread(&self, user_id: UserId) -> UsersResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users.notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn find_notification(
        &self,
        notification_id: NotificationId,
    ) -> UsersResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM users.notifications WHERE id = $1"
        ))
        .bind(notification_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(NotificationRow::into_notification))
    }
}

// ============================================================================
// Notification Preference Repository Implementation
// ============================================================================

impl NotificationPreferenceRepository for PgUsersRepository {
    async fn find_preferences(
        &self,
        user_id: UserId,
    ) -> UsersResult<Option<NotificationPreference>> {
        let row = sqlx::query_as::<_, PreferenceRow>(&format!(
            "SELECT {PREFERENCE_COLUMNS} FROM users.notification_preferences WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PreferenceRow::into_preferences))
    }
}

// ============================================================================
// Unit of Work
// ============================================================================

impl UsersUnitOfWork for PgUsersRepository {
    async fn commit(&self, changes: ChangeSet) -> UsersResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let messages = changes
            .events()
            .iter()
            .map(|event| event.to_outbox_message(changes.now()))
            .collect::<Result<Vec<OutboxMessage>, _>>()?;

        let mut tx = self.pool.begin().await?;

        for (op, user) in changes.users() {
            write_user(&mut tx, *op, user).await?;
        }
        for (op, profile) in changes.profiles() {
            write_profile(&mut tx, *op, profile).await?;
        }
        for (op, preferences) in changes.preferences() {
            write_preferences(&mut tx, *op, preferences).await?;
        }
        for (op, address) in changes.addresses() {
            write_address(&mut tx, *op, address).await?;
        }
        for (op, session) in changes.sessions() {
            write_session(&mut tx, *op, session).await?;
        }
        for entry in changes.login_history() {
            insert_login_history(&mut tx, entry).await?;
        }
        for (op, notification) in changes.notifications() {
            write_notification(&mut tx, *op, notification).await?;
        }

        outbox::insert_messages(&mut tx, &messages).await?;
        tx.commit().await?;

        tracing::debug!(outbox_messages = messages.len(), "Users changes committed");
        Ok(())
    }
}

async fn write_user(conn: &mut PgConnection, op: Op, user: &User) -> UsersResult<()> {
    let roles: Vec<String> = user.role_codes();
    let failed = i32::try_from(user.failed_login_count).unwrap_or(i32::MAX);

    let query = match op {
        Op::Insert => {
            r#"
            INSERT INTO users.users (
                id, email, email_confirmed, password_hash, security_stamp, roles,
                failed_login_count, locked_until, last_login_at,
                updated_at, deleted_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#
        }
        Op::Update => {
            r#"
            UPDATE users.users SET
                email = $2,
                email_confirmed = $3,
                password_hash = $4,
                security_stamp = $5,
                roles = $6,
                failed_login_count = $7,
                locked_until = $8,
                last_login_at = $9,
                updated_at = $10,
                deleted_at = $11
            WHERE id = $1
            "#
        }
    };

    let mut q = sqlx::query(query)
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.email_confirmed)
        .bind(user.password_hash.as_str())
        .bind(&user.security_stamp)
        .bind(&roles)
        .bind(failed)
        .bind(user.locked_until)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .bind(user.deleted_at);
    if op == Op::Insert {
        q = q.bind(user.created_at);
    }
    q.execute(&mut *conn).await?;

    Ok(())
}

/// Updates only apply while the stored version still matches
async fn write_profile(conn: &mut PgConnection, op: Op, profile: &Profile) -> UsersResult<()> {
    match op {
        Op::Insert => {
            sqlx::query(
                r#"
                INSERT INTO users.profiles (
                    id, user_id, first_name, last_name, display_name, avatar_url,
                    birth_date, gender, cpf, phone, preferred_language,
                    preferred_currency, newsletter_subscribed, accepted_terms_at,
                    accepted_privacy_at, version, created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                "#,
            )
            .bind(profile.id.as_uuid())
            .bind(profile.user_id.as_uuid())
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(profile.display_name.as_deref())
            .bind(profile.avatar_url.as_deref())
            .bind(profile.birth_date)
            .bind(profile.gender.id())
            .bind(profile.cpf.as_ref().map(Cpf::as_str))
            .bind(profile.phone.as_ref().map(Phone::as_str))
            .bind(&profile.preferred_language)
            .bind(&profile.preferred_currency)
            .bind(profile.newsletter_subscribed)
            .bind(profile.accepted_terms_at)
            .bind(profile.accepted_privacy_at)
            .bind(profile.version)
            .bind(profile.created_at)
            .bind(profile.updated_at)
            .bind(profile.deleted_at)
            .execute(&mut *conn)
            .await?;
        }
        Op::Update => {
            let updated = sqlx::query(
                r#"
                UPDATE users.profiles SET
                    first_name = $3,
                    last_name = $4,
                    display_name = $5,
                    avatar_url = $6,
                    birth_date = $7,
                    gender = $8,
                    cpf = $9,
                    phone = $10,
                    preferred_language = $11,
                    preferred_currency = $12,
                    newsletter_subscribed = $13,
                    accepted_terms_at = $14,
                    accepted_privacy_at = $15,
                    version = $16,
                    updated_at = $17,
                    deleted_at = $18
                WHERE id = $1 AND version = $2
                "#,
            )
            .bind(profile.id.as_uuid())
            .bind(profile.expected_version())
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(profile.display_name.as_deref())
            .bind(profile.avatar_url.as_deref())
            .bind(profile.birth_date)
            .bind(profile.gender.id())
            .bind(profile.cpf.as_ref().map(Cpf::as_str))
            .bind(profile.phone.as_ref().map(Phone::as_str))
            .bind(&profile.preferred_language)
            .bind(&profile.preferred_currency)
            .bind(profile.newsletter_subscribed)
            .bind(profile.accepted_terms_at)
            .bind(profile.accepted_privacy_at)
            .bind(profile.version)
            .bind(profile.updated_at)
            .bind(profile.deleted_at)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            if updated == 0 {
                tracing::warn!(
                    profile_id = %profile.id,
                    expected_version = profile.expected_version(),
                    "Profile version conflict"
                );
                return Err(UsersError::ConcurrencyConflict);
            }
        }
    }
    Ok(())
}

async fn write_preferences(
    conn: &mut PgConnection,
    op: Op,
    preferences: &NotificationPreference,
) -> UsersResult<()> {
    let query = match op {
        // Lazily created rows can race; the first one wins
        Op::Insert => {
            r#"
            INSERT INTO users.notification_preferences (
                id, user_id, email_enabled, push_enabled, sms_enabled, order_updates,
                promotions, price_drops, back_in_stock, newsletter, updated_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id) DO NOTHING
            "#
        }
        Op::Update => {
            r#"
            UPDATE users.notification_preferences SET
                email_enabled = $3,
                push_enabled = $4,
                sms_enabled = $5,
                order_updates = $6,
                promotions = $7,
                price_drops = $8,
                back_in_stock = $9,
                newsletter = $10,
                updated_at = $11
            WHERE id = $1 AND user_id = $2
            "#
        }
    };

    let mut q = sqlx::query(query)
        .bind(preferences.id.as_uuid())
        .bind(preferences.user_id.as_uuid())
        .bind(preferences.email_enabled)
        .bind(preferences.push_enabled)
        .bind(preferences.sms_enabled)
        .bind(preferences.order_updates)
        .bind(preferences.promotions)
        .bind(preferences.price_drops)
        .bind(preferences.back_in_stock)
        .bind(preferences.newsletter)
        .bind(preferences.updated_at);
    if op == Op::Insert {
        q = q.bind(preferences.created_at);
    }
    q.execute(&mut *conn).await?;

    Ok(())
}

async fn write_address(conn: &mut PgConnection, op: Op, address: &Address) -> UsersResult<()> {
    let query = match op {
        Op::Insert => {
            r#"
            INSERT INTO users.addresses (
                id, user_id, label, recipient_name, street, number, complement,
                neighborhood, city, state, postal_code, country, latitude, longitude,
                ibge_code, is_default, is_billing_address, updated_at, deleted_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#
        }
        Op::Update => {
            r#"
            UPDATE users.addresses SET
                label = $3,
                recipient_name = $4,
                street = $5,
                number = $6,
                complement = $7,
                neighborhood = $8,
                city = $9,
                state = $10,
                postal_code = $11,
                country = $12,
                latitude = $13,
                longitude = $14,
                ibge_code = $15,
                is_default = $16,
                is_billing_address = $17,
                updated_at = $18,
                deleted_at = $19
            WHERE id = $1 AND user_id = $2
            "#
        }
    };

    let mut q = sqlx::query(query)
        .bind(address.id.as_uuid())
        .bind(address.user_id.as_uuid())
        .bind(address.label.as_deref())
        .bind(address.recipient_name.as_deref())
        .bind(&address.street)
        .bind(address.number.as_deref())
        .bind(address.complement.as_deref())
        .bind(address.neighborhood.as_deref())
        .bind(&address.city)
        .bind(address.state.as_str())
        .bind(address.postal_code.as_str())
        .bind(&address.country)
        .bind(address.latitude)
        .bind(address.longitude)
        .bind(address.ibge_code.as_deref())
        .bind(address.is_default)
        .bind(address.is_billing_address)
        .bind(address.updated_at)
        .bind(address.deleted_at);
    if op == Op::Insert {
        q = q.bind(address.created_at);
    }
    q.execute(&mut *conn).await?;

    Ok(())
}

async fn write_session(conn: &mut PgConnection, op: Op, session: &Session) -> UsersResult<()> {
    let query = match op {
        Op::Insert => {
            r#"
            INSERT INTO users.sessions (
                id, user_id, refresh_token_hash, device_id, device_name, device_type,
                ip_address, user_agent, country, city, expires_at, revoked_at,
                revoked_reason, last_activity_at, updated_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#
        }
        Op::Update => {
            r#"
            UPDATE users.sessions SET
                refresh_token_hash = $3,
                device_id = $4,
                device_name = $5,
                device_type = $6,
                ip_address = $7,
                user_agent = $8,
                country = $9,
                city = $10,
                expires_at = $11,
                revoked_at = $12,
                revoked_reason = $13,
                last_activity_at = $14,
                updated_at = $15
            WHERE id = $1 AND user_id = $2
            "#
        }
    };

    let mut q = sqlx::query(query)
        .bind(session.id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(&session.refresh_token_hash)
        .bind(session.device_id.as_deref())
        .bind(session.device_name.as_deref())
        .bind(session.device_type.as_str())
        .bind(session.ip_address.as_deref())
        .bind(session.user_agent.as_deref())
        .bind(session.country.as_deref())
        .bind(session.city.as_deref())
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .bind(session.revoked_reason.as_deref())
        .bind(session.last_activity_at)
        .bind(session.updated_at);
    if op == Op::Insert {
        q = q.bind(session.created_at);
    }
    q.execute(&mut *conn).await?;

    Ok(())
}

async fn insert_login_history(conn: &mut PgConnection, entry: &LoginHistory) -> UsersResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users.login_history (
            id, user_id, provider, success, failure_reason, ip_address,
            user_agent, device_type, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.user_id.as_uuid())
    .bind(entry.provider.id())
    .bind(entry.success)
    .bind(entry.failure_reason.as_deref())
    .bind(entry.ip_address.as_deref())
    .bind(entry.user_agent.as_deref())
    .bind(entry.device_type.as_str())
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn write_notification(
    conn: &mut PgConnection,
    op: Op,
    notification: &Notification,
) -> UsersResult<()> {
    let query = match op {
        Op::Insert => {
            r#"
            INSERT INTO users.notifications (
                id, user_id, title, message, notification_type, reference_type,
                reference_id, action_url, read_at, updated_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#
        }
        Op::Update => {
            r#"
            UPDATE users.notifications SET
                title = $3,
                message = $4,
                notification_type = $5,
                reference_type = $6,
                reference_id = $7,
                action_url = $8,
                read_at = $9,
                updated_at = $10
            WHERE id = $1 AND user_id = $2
            "#
        }
    };

    let mut q = sqlx::query(query)
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type.id())
        .bind(notification.reference_type.id())
        .bind(notification.reference_id)
        .bind(notification.action_url.as_deref())
        .bind(notification.read_at)
        .bind(notification.updated_at);
    if op == Op::Insert {
        q = q.bind(notification.created_at);
    }
    q.execute(&mut *conn).await?;

    Ok(())
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    email_confirmed: bool,
    password_hash: String,
    security_stamp: String,
    roles: Vec<String>,
    failed_login_count: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self) -> UsersResult<User> {
        let password_hash = HashedPassword::from_stored(self.password_hash)
            .map_err(|e| UsersError::Internal(format!("Invalid password hash: {e}")))?;

        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter_map(|code| Role::from_code(code))
            .collect();
        roles.sort();
        roles.dedup();

        Ok(User {
            id: UserId::from_uuid(self.id),
            email: Email::from_db(self.email),
            email_confirmed: self.email_confirmed,
            password_hash,
            security_stamp: self.security_stamp,
            roles,
            failed_login_count: u32::try_from(self.failed_login_count).unwrap_or(0),
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            events: Vec::new(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    first_name: String,
    last_name: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    birth_date: Option<NaiveDate>,
    gender: i16,
    cpf: Option<String>,
    phone: Option<String>,
    preferred_language: String,
    preferred_currency: String,
    newsletter_subscribed: bool,
    accepted_terms_at: Option<DateTime<Utc>>,
    accepted_privacy_at: Option<DateTime<Utc>>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl ProfileRow {
    fn into_profile(self) -> Profile {
        Profile {
            id: ProfileId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            first_name: self.first_name,
            last_name: self.last_name,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            birth_date: self.birth_date,
            gender: Gender::from_id(self.gender).unwrap_or_default(),
            cpf: self.cpf.map(Cpf::from_db),
            phone: self.phone.map(Phone::from_db),
            preferred_language: self.preferred_language,
            preferred_currency: self.preferred_currency,
            newsletter_subscribed: self.newsletter_subscribed,
            accepted_terms_at: self.accepted_terms_at,
            accepted_privacy_at: self.accepted_privacy_at,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            loaded_version: self.version,
            events: Vec::new(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: Uuid,
    label: Option<String>,
    recipient_name: Option<String>,
    street: String,
    number: Option<String>,
    complement: Option<String>,
    neighborhood: Option<String>,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    ibge_code: Option<String>,
    is_default: bool,
    is_billing_address: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl AddressRow {
    fn into_address(self) -> Address {
        Address {
            id: AddressId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            label: self.label,
            recipient_name: self.recipient_name,
            street: self.street,
            number: self.number,
            complement: self.complement,
            neighborhood: self.neighborhood,
            city: self.city,
            state: StateCode::from_db(self.state),
            postal_code: PostalCode::from_db(self.postal_code),
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
            ibge_code: self.ibge_code,
            is_default: self.is_default,
            is_billing_address: self.is_billing_address,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            events: Vec::new(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    refresh_token_hash: String,
    device_id: Option<String>,
    device_name: Option<String>,
    device_type: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    country: Option<String>,
    city: Option<String>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_reason: Option<String>,
    last_activity_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: SessionId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            refresh_token_hash: self.refresh_token_hash,
            device_id: self.device_id,
            device_name: self.device_name,
            device_type: DeviceType::parse(&self.device_type),
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            country: self.country,
            city: self.city,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            revoked_reason: self.revoked_reason,
            last_activity_at: self.last_activity_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: Vec::new(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct LoginHistoryRow {
    id: Uuid,
    user_id: Uuid,
    provider: i16,
    success: bool,
    failure_reason: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    device_type: String,
    created_at: DateTime<Utc>,
}

impl LoginHistoryRow {
    fn into_entry(self) -> LoginHistory {
        LoginHistory {
            id: LoginHistoryId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            provider: LoginProvider::from_id(self.provider).unwrap_or_default(),
            success: self.success,
            failure_reason: self.failure_reason,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            device_type: DeviceType::parse(&self.device_type),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    notification_type: i16,
    reference_type: i16,
    reference_id: Option<Uuid>,
    action_url: Option<String>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Notification {
        Notification {
            id: NotificationId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            title: self.title,
            message: self.message,
            notification_type: NotificationType::from_id(self.notification_type)
                .unwrap_or_default(),
            reference_type: ReferenceType::from_id(self.reference_type).unwrap_or_default(),
            reference_id: self.reference_id,
            action_url: self.action_url,
            read_at: self.read_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: Vec::new(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct PreferenceRow {
    id: Uuid,
    user_id: Uuid,
    email_enabled: bool,
    push_enabled: bool,
    sms_enabled: bool,
    order_updates: bool,
    promotions: bool,
    price_drops: bool,
    back_in_stock: bool,
    newsletter: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PreferenceRow {
    fn into_preferences(self) -> NotificationPreference {
        NotificationPreference {
            id: NotificationPreferenceId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            email_enabled: self.email_enabled,
            push_enabled: self.push_enabled,
            sms_enabled: self.sms_enabled,
            order_updates: self.order_updates,
            promotions: self.promotions,
            price_drops: self.price_drops,
            back_in_stock: self.back_in_stock,
            newsletter: self.newsletter,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
