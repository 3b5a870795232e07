use crate::client::CatalogClient;
use crate::config::Features;
use crate::error::{Error, Result};
use crate::permissions::RoleTable;
use crate::user_models::{MemberApplication, RegistrationForm, Role, Session};

#[derive(Clone)]
pub struct Membership {
    client: CatalogClient,
    roles: RoleTable,
    features: Features,
}

impl Membership {
    pub fn new(client: CatalogClient, roles: RoleTable, features: Features) -> Self {
        Self {
            client,
            roles,
            features,
        }
    }

    /// Validates locally, then files the application under the fixed
    /// self-registration role.
    pub async fn register(&self, form: &RegistrationForm) -> Result<String> {
        if !self.features.registration {
            return Err(Error::RegistrationDisabled);
        }
        let registration = form.validate()?;
        let message = self.client.register(&registration).await?;
        tracing::info!(email = %registration.email, "membership application submitted");
        Ok(message)
    }

    fn moderator<'a>(&self, session: Option<&'a Session>) -> Result<&'a Session> {
        let session = session.ok_or(Error::NotLoggedIn)?;
        if !self.roles.for_session(Some(session)).can_moderate {
            return Err(Error::Forbidden("review membership applications"));
        }
        Ok(session)
    }

    pub async fn pending(&self, session: Option<&Session>) -> Result<Vec<MemberApplication>> {
        let session = self.moderator(session)?;
        self.client.get_pending_members(&session.token).await
    }

    /// Activates the application. Without an explicit role the applicant's
    /// requested role is used.
    pub async fn approve(
        &self,
        session: Option<&Session>,
        application: &MemberApplication,
        role: Option<Role>,
    ) -> Result<Role> {
        let session = self.moderator(session)?;
        let role = role.unwrap_or_else(|| application.role.clone());
        self.client
            .approve_member(&session.token, &application.email, &role)
            .await?;
        tracing::info!(email = %application.email, role = %role, "membership approved");
        Ok(role)
    }

    pub async fn reject(&self, session: Option<&Session>, application: &MemberApplication) -> Result<()> {
        let session = self.moderator(session)?;
        self.client
            .reject_member(&session.token, &application.email)
            .await?;
        tracing::info!(email = %application.email, "membership rejected");
        Ok(())
    }

    pub async fn find_pending(&self, session: Option<&Session>, email: &str) -> Result<MemberApplication> {
        let email = email.trim();
        self.pending(session)
            .await?
            .into_iter()
            .find(|app| app.email.trim() == email)
            .ok_or_else(|| Error::Remote(format!("No pending application for {}", email)))
    }
}
