use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::client::CatalogClient;
use crate::error::{Error, Result};
use crate::models::{ModerationStatus, Video};
use crate::permissions::RoleTable;
use crate::user_models::Session;

impl ModerationStatus {
    /// Moderator transitions: approve, feature an approved video, or send an
    /// approved or featured video back to pending.
    pub fn can_transition_to(&self, target: ModerationStatus) -> bool {
        use ModerationStatus::*;
        matches!(
            (self, target),
            (Pending, Approved) | (Approved, Featured) | (Approved, Pending) | (Featured, Pending)
        )
    }

    pub fn available_transitions(&self) -> Vec<ModerationStatus> {
        [
            ModerationStatus::Approved,
            ModerationStatus::Featured,
            ModerationStatus::Pending,
        ]
        .into_iter()
        .filter(|target| self.can_transition_to(*target))
        .collect()
    }

    pub fn transition(self, target: ModerationStatus) -> Result<ModerationStatus> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(Error::InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

/// Status changes for the admin surface. At most one request per video is in
/// flight at a time.
#[derive(Clone)]
pub struct ModerationDesk {
    client: CatalogClient,
    roles: RoleTable,
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

struct InFlight {
    id: i64,
    set: Arc<Mutex<HashSet<i64>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl ModerationDesk {
    pub fn new(client: CatalogClient, roles: RoleTable) -> Self {
        Self {
            client,
            roles,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_busy(&self, id: i64) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    fn claim(&self, id: i64) -> Result<InFlight> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(id) {
            return Err(Error::Busy(id));
        }
        Ok(InFlight {
            id,
            set: Arc::clone(&self.in_flight),
        })
    }

    /// Moves `video` to `target` and returns the full reloaded listing. Any
    /// error other than `ReloadFailed` means the change was not applied.
    pub async fn change_status(
        &self,
        session: Option<&Session>,
        video: &Video,
        target: ModerationStatus,
    ) -> Result<Vec<Video>> {
        let session = session.ok_or(Error::NotLoggedIn)?;
        if !self.roles.for_session(Some(session)).can_moderate {
            return Err(Error::Forbidden("moderate videos"));
        }
        video.status.transition(target)?;

        let _guard = self.claim(video.id)?;
        self.client
            .update_status(&session.token, video.id, target)
            .await?;
        tracing::info!(id = video.id, from = %video.status, to = %target, "moderation status changed");

        self.client
            .get_videos(true, None)
            .await
            .map_err(|e| Error::ReloadFailed {
                id: video.id,
                applied: target,
                source: Box::new(e),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTab {
    Pending,
    All,
}

impl std::str::FromStr for AdminTab {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(AdminTab::Pending),
            "all" => Ok(AdminTab::All),
            other => Err(format!("Unknown tab '{}'. Use pending or all", other)),
        }
    }
}

pub fn filter_tab(videos: &[Video], tab: AdminTab) -> Vec<Video> {
    videos
        .iter()
        .filter(|v| tab == AdminTab::All || v.status == ModerationStatus::Pending)
        .cloned()
        .collect()
}
