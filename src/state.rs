use std::sync::Arc;

use crate::auth::AuthSettings;
use crate::email::Mailer;
use crate::store::Store;

/// Shared handles every request can reach through `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, auth: AuthSettings) -> Self {
        Self {
            store,
            mailer,
            auth,
        }
    }
}
