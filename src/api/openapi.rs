//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::dto::{HealthResponse, MessageDto};
use crate::domain::SubjectId;
use crate::api::handlers::{messages, system};
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "chat-relay", description = "Real-time chat relay REST API"),
    paths(system::health_handler, messages::list_messages),
    components(schemas(HealthResponse, MessageDto, SubjectId, ErrorResponse, ErrorBody)),
    tags(
        (name = "System", description = "Service health"),
        (name = "Messages", description = "Chat history"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_all_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/health"));
        assert!(doc.paths.paths.contains_key("/api/messages"));
    }
}
