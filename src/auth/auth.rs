use axum::{http::StatusCode, Json};

use crate::models::{DocError, ErrorResponse};
use crate::services::session_service::{ensure_session_access, SessionDirectory};

/// Authenticated caller, set by the auth middleware
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Principal {
    User { id: String, name: String },
    Service { name: String },
}

impl Principal {
    pub fn id(&self) -> &str {
        match self {
            Principal::User { id, .. } => id,
            Principal::Service { name } => name,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Principal::User { name, .. } => name,
            Principal::Service { name } => name,
        }
    }
}

pub fn ensure_service(principal: &Principal) -> Result<&str, (StatusCode, Json<ErrorResponse>)> {
    match principal {
        Principal::Service { name } => Ok(name),
        Principal::User { id, .. } => Err(ErrorResponse::reply(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            format!("User '{}' is not a service", id),
        )),
    }
}

/// Users must belong to the session; services are trusted.
pub async fn ensure_session_member(
    sessions: &dyn SessionDirectory,
    principal: &Principal,
    session_id: i64,
) -> Result<(), DocError> {
    match principal {
        Principal::Service { .. } => Ok(()),
        Principal::User { id, .. } => ensure_session_access(sessions, id, session_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_service::StaticSessionDirectory;

    #[tokio::test]
    async fn services_bypass_session_membership() {
        let sessions = StaticSessionDirectory::new().with_session(1, ["ada"]);
        let service = Principal::Service { name: "sessions".into() };
        let eve = Principal::User { id: "eve".into(), name: "Eve".into() };

        assert!(ensure_session_member(&sessions, &service, 1).await.is_ok());
        assert!(matches!(
            ensure_session_member(&sessions, &eve, 1).await,
            Err(DocError::Forbidden(1))
        ));
        assert!(ensure_service(&service).is_ok());
        assert!(ensure_service(&eve).is_err());
    }
}
