pub mod drive_client;
pub mod portal_client;

pub use drive_client::{DriveApi, GoogleDriveClient};
pub use portal_client::{password_hash, PortalApi, PortalClient};
