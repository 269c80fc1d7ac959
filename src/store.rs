//! Local persistence of the editing session: the draft text plus the
//! lifecycle state (rejections, applied metadata) that must survive reloads.

use async_trait::async_trait;

use crate::api::{SavePayload, SaveService};
use crate::error::SaveError;

pub fn load() -> SavePayload {
    confy::load("redraft", "session").unwrap_or_default()
}

pub fn save(payload: &SavePayload) {
    let _ = confy::store("redraft", "session", payload.clone());
}

/// Save service backed by the local confy store. The default persistence
/// when no backend is configured.
pub struct LocalSaveService;

#[async_trait]
impl SaveService for LocalSaveService {
    async fn save(&self, payload: &SavePayload) -> Result<(), SaveError> {
        confy::store("redraft", "session", payload.clone()).map_err(|e| SaveError(e.to_string()))
    }
}
