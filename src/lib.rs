//! Client library for the media-literacy video library: role capabilities,
//! the moderation workflow, catalog filtering, and the remote catalog API.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod members;
pub mod models;
pub mod moderation;
pub mod permissions;
pub mod render;
pub mod session;
pub mod storage;
pub mod user_models;
pub mod videos;

pub use client::CatalogClient;
pub use config::{Config, Features};
pub use error::{Error, Result, ValidationError};
pub use models::{ModerationStatus, MultiValue, Video, VideoForm};
pub use permissions::{capabilities_for, Capabilities, RoleTable, Route};
pub use user_models::{Role, Session, User};
