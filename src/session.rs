use crate::client::CatalogClient;
use crate::error::{Error, Result};
use crate::permissions::{route_for, Capabilities, Route, RoleTable};
use crate::storage::SessionStore;
use crate::user_models::{Credentials, Session};

/// Holds at most one authenticated identity and keeps it in sync with the
/// on-disk store.
pub struct SessionManager {
    client: CatalogClient,
    store: SessionStore,
    roles: RoleTable,
    current: Option<Session>,
}

impl SessionManager {
    pub fn new(client: CatalogClient, store: SessionStore, roles: RoleTable) -> Self {
        Self {
            client,
            store,
            roles,
            current: None,
        }
    }

    /// Restores the persisted session, if any. Never fails.
    pub fn rehydrate(&mut self) -> Option<&Session> {
        self.current = self.store.load();
        if let Some(session) = &self.current {
            tracing::info!(email = %session.user.email, role = %session.user.role, "session restored");
        }
        self.current.as_ref()
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<(&Session, Route)> {
        let session = self.client.login(credentials).await?;
        self.store.save(&session)?;
        tracing::info!(email = %session.user.email, role = %session.user.role, "logged in");

        let route = route_for(&self.roles.for_session(Some(&session)));
        let session: &Session = self.current.insert(session);
        Ok((session, route))
    }

    pub fn logout(&mut self) -> Route {
        self.current = None;
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to remove stored session");
        }
        tracing::info!("logged out");
        Route::Public
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn require(&self) -> Result<&Session> {
        self.current.as_ref().ok_or(Error::NotLoggedIn)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.roles.for_session(self.current.as_ref())
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }
}
