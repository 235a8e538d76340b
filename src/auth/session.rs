use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "tci_session";

/// Per-caller session state. Holds the token and nothing derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }

    pub(crate) fn store_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub(crate) fn clear(&mut self) {
        self.token = None;
    }
}

struct Entry {
    session: Session,
    // None when the token lifetime does not fit the calendar
    expires_at: Option<OffsetDateTime>,
}

impl Entry {
    fn live_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Session-id → session map. Anonymous sessions are not kept, and every
/// sign-in gets a freshly minted id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl SessionRegistry {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Entry>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Entry>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn load(&self, id: Uuid) -> Session {
        let now = OffsetDateTime::now_utc();
        self.read()
            .get(&id)
            .filter(|entry| entry.live_at(now))
            .map(|entry| entry.session.clone())
            .unwrap_or_default()
    }

    /// Stores a freshly signed-in session under a new id and forgets the id
    /// the caller arrived with. Returns the new id.
    pub fn start(&self, replaced: Option<Uuid>, session: Session, ttl: Duration) -> Uuid {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let mut map = self.write();
        map.retain(|_, entry| entry.live_at(now));
        if let Some(old) = replaced {
            map.remove(&old);
        }
        if !session.is_anonymous() {
            let expires_at = now.checked_add(ttl);
            map.insert(id, Entry { session, expires_at });
        }
        id
    }

    pub fn end(&self, id: Uuid) {
        self.write().remove(&id);
    }

    /// Drops the session only if it still holds `token`. A concurrent logout
    /// or sign-in under the same id is left alone.
    pub fn discard_if_token(&self, id: Uuid, token: &str) {
        let now = OffsetDateTime::now_utc();
        let mut map = self.write();
        map.retain(|_, entry| entry.live_at(now));
        if map.get(&id).and_then(|entry| entry.session.token()) == Some(token) {
            map.remove(&id);
        }
    }

    pub fn authenticated_count(&self) -> usize {
        self.read().len()
    }
}

/// Session id from the `tci_session` cookie, if the caller sent a valid one.
#[derive(Debug, Clone, Copy)]
pub struct SessionKey(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionKey
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(session_id_from_cookie);
        Ok(SessionKey(id))
    }
}

pub(crate) fn session_id_from_cookie(header: &str) -> Option<Uuid> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn set_cookie(id: Uuid) -> HeaderValue {
    // uuid text is always a valid header value
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn expire_cookie() -> HeaderValue {
    HeaderValue::from_static("tci_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
