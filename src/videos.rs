use crate::client::CatalogClient;
use crate::config::Features;
use crate::error::{Error, Result};
use crate::models::{ModerationStatus, NewVideo, Video, VideoForm};
use crate::permissions::{can_modify, RoleTable};
use crate::user_models::Session;

/// Create, edit and delete, gated on role and ownership. Every check runs
/// before the request is sent.
#[derive(Clone)]
pub struct VideoLibrary {
    client: CatalogClient,
    roles: RoleTable,
    features: Features,
}

impl VideoLibrary {
    pub fn new(client: CatalogClient, roles: RoleTable, features: Features) -> Self {
        Self {
            client,
            roles,
            features,
        }
    }

    /// Builds the record to submit: owned by the session and always pending.
    pub fn prepare_new(&self, session: Option<&Session>, form: &VideoForm) -> Result<NewVideo> {
        let session = session.ok_or(Error::NotLoggedIn)?;
        if !self.roles.for_session(Some(session)).can_upload {
            return Err(Error::Forbidden("upload videos"));
        }
        let content = form.validate(&self.features)?;
        Ok(NewVideo {
            content,
            uploader_email: session.user.email.trim().to_string(),
            status: ModerationStatus::Pending,
        })
    }

    pub async fn create(&self, session: Option<&Session>, form: &VideoForm) -> Result<NewVideo> {
        let video = self.prepare_new(session, form)?;
        let token = session.map(|s| s.token.as_str()).unwrap_or_default();
        self.client.add_video(token, &video).await?;
        tracing::info!(title = %video.content.title, uploader = %video.uploader_email, "video submitted");
        Ok(video)
    }

    /// Applies a full-field edit. Identifier, uploader and status come from
    /// the stored record.
    pub fn prepare_edit(
        &self,
        session: Option<&Session>,
        stored: &Video,
        form: &VideoForm,
    ) -> Result<Video> {
        if session.is_none() {
            return Err(Error::NotLoggedIn);
        }
        if !can_modify(&self.roles, session, stored) {
            return Err(Error::Forbidden("edit this video"));
        }
        let content = form.validate(&self.features)?;
        Ok(Video {
            id: stored.id,
            content,
            uploader_email: stored.uploader_email.clone(),
            status: stored.status,
        })
    }

    pub async fn update(
        &self,
        session: Option<&Session>,
        stored: &Video,
        form: &VideoForm,
    ) -> Result<Video> {
        let video = self.prepare_edit(session, stored, form)?;
        let token = session.map(|s| s.token.as_str()).unwrap_or_default();
        self.client.update_video(token, &video).await?;
        tracing::info!(id = video.id, "video updated");
        Ok(video)
    }

    pub async fn delete(&self, session: Option<&Session>, video: &Video) -> Result<()> {
        let session = session.ok_or(Error::NotLoggedIn)?;
        if !can_modify(&self.roles, Some(session), video) {
            return Err(Error::Forbidden("delete this video"));
        }
        self.client.delete_video(&session.token, video.id).await?;
        tracing::info!(id = video.id, "video deleted");
        Ok(())
    }

    pub async fn find(&self, id: i64) -> Result<Video> {
        self.client
            .get_videos(true, None)
            .await?
            .into_iter()
            .find(|v| v.id == id)
            .ok_or(Error::VideoNotFound(id))
    }
}
