use crate::use_cases::SessionDirectory;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Rooms and their participants; the only shared mutable state.
    pub directory: Arc<SessionDirectory>,
}
