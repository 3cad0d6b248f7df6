//! Teacher account edits. Renaming and role changes are separate endpoints,
//! so one logical edit is two requests and may land half-way.

use reqwest::Method;

use super::{DropletClient, DropletError};
use crate::models::{UserNameUpdate, UserRoleUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEdit {
    pub title: String,
    pub first_name: String,
    pub surname: String,
    pub role: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UserEditError {
    #[error("Name fields and role cannot be empty.")]
    MissingFields,
    #[error("Could not update user: {0}")]
    NameFailed(#[source] DropletError),
    /// The name step committed before the role step failed.
    #[error("Partial update: the name was saved but the role was not changed: {0}")]
    RoleFailed(#[source] DropletError),
}

impl UserEditError {
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::RoleFailed(_))
    }

    pub fn is_session_expired(&self) -> bool {
        match self {
            Self::NameFailed(e) | Self::RoleFailed(e) => e.is_session_expired(),
            Self::MissingFields => false,
        }
    }
}

impl DropletClient {
    /// Library API for admin tooling; the console itself has no user screens.
    pub async fn edit_user(&self, user_id: &str, edit: &UserEdit) -> Result<(), UserEditError> {
        let fields = [&edit.title, &edit.first_name, &edit.surname, &edit.role];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(UserEditError::MissingFields);
        }

        let name = UserNameUpdate {
            title: edit.title.trim().to_string(),
            first_name: edit.first_name.trim().to_string(),
            surname: edit.surname.trim().to_string(),
        };
        let role = UserRoleUpdate {
            role: edit.role.trim().to_string(),
        };

        let step = |path: String| self.request(Method::PATCH, &path);

        let name_req = step(format!("/users/{user_id}/name")).map_err(UserEditError::NameFailed)?;
        self.send(name_req.json(&name))
            .await
            .map_err(UserEditError::NameFailed)?;

        let role_req = step(format!("/users/{user_id}/role")).map_err(UserEditError::RoleFailed)?;
        if let Err(e) = self.send(role_req.json(&role)).await {
            tracing::warn!(%user_id, "user name updated but role update failed: {e}");
            return Err(UserEditError::RoleFailed(e));
        }

        tracing::info!(%user_id, "user updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn edit() -> UserEdit {
        UserEdit {
            title: "Ms".into(),
            first_name: "Ann".into(),
            surname: "Smith".into(),
            role: "admin".into(),
        }
    }

    #[tokio::test]
    async fn both_steps_succeed() {
        let mut server = Server::new_async().await;
        let name = server
            .mock("PATCH", "/api/users/u1/name")
            .with_status(200)
            .create_async()
            .await;
        let role = server
            .mock("PATCH", "/api/users/u1/role")
            .with_status(200)
            .create_async()
            .await;

        let client = DropletClient::new(&server.url()).unwrap().with_token("t");
        client.edit_user("u1", &edit()).await.unwrap();
        name.assert_async().await;
        role.assert_async().await;
    }

    #[tokio::test]
    async fn role_failure_after_name_success_reports_partial_update() {
        let mut server = Server::new_async().await;
        let _name = server
            .mock("PATCH", "/api/users/u1/name")
            .with_status(200)
            .create_async()
            .await;
        let _role = server
            .mock("PATCH", "/api/users/u1/role")
            .with_status(400)
            .with_body(r#"{"error":"invalid role"}"#)
            .create_async()
            .await;

        let client = DropletClient::new(&server.url()).unwrap().with_token("t");
        let err = client.edit_user("u1", &edit()).await.unwrap_err();
        assert!(err.is_partial());
        assert!(err.to_string().contains("name was saved"));
        assert!(err.to_string().contains("invalid role"));
    }

    #[tokio::test]
    async fn name_failure_skips_role_step() {
        let mut server = Server::new_async().await;
        let _name = server
            .mock("PATCH", "/api/users/u1/name")
            .with_status(500)
            .create_async()
            .await;
        let role = server
            .mock("PATCH", "/api/users/u1/role")
            .expect(0)
            .create_async()
            .await;

        let client = DropletClient::new(&server.url()).unwrap().with_token("t");
        let err = client.edit_user("u1", &edit()).await.unwrap_err();
        assert!(!err.is_partial());
        role.assert_async().await;
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_locally() {
        let server = Server::new_async().await;
        let client = DropletClient::new(&server.url()).unwrap();
        let mut bad = edit();
        bad.surname = "  ".into();
        assert!(matches!(
            client.edit_user("u1", &bad).await,
            Err(UserEditError::MissingFields)
        ));
    }
}
