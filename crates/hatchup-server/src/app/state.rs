use std::sync::Arc;

use hatchup_application::{AnalysisService, ChatUseCase};

use crate::identity::IdentityResolver;

/// Components shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub chat: Arc<ChatUseCase>,
    pub identity: Arc<IdentityResolver>,
}

impl AppState {
    pub fn new(
        analysis: Arc<AnalysisService>,
        chat: Arc<ChatUseCase>,
        identity: Arc<IdentityResolver>,
    ) -> Self {
        Self {
            analysis,
            chat,
            identity,
        }
    }
}
