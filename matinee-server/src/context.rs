use std::sync::Arc;

use matinee_collab::Collab;

use crate::gateway::Gateway;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ServerContext {
    pub collab: Arc<Collab>,
    pub gateway: Arc<Gateway>,
}
