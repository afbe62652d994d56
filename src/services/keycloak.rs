//! Identity provider (Keycloak) realm provisioning
//!
//! Ensures the realm, public client, client scopes, realm roles and the
//! initial admin user exist on the configured identity provider. The
//! admin REST API is treated as an idempotent resource-creation API:
//! resources that already exist (HTTP 409) are left untouched, so
//! provisioning is safe to run on every startup.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

/// Client scopes requested by the frontend
const CLIENT_SCOPES: &[&str] = &["timekeeper-api"];

/// Realm roles known to the application
const REALM_ROLES: &[&str] = &["admin", "user"];

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity provider rejected {action}: HTTP {status}")]
    Rejected {
        action: &'static str,
        status: StatusCode,
    },
}

/// The subset of the identity provider's admin API the provisioning
/// workflow depends on. Every create is create-if-missing.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn realm_exists(&self, realm: &str) -> Result<bool, ProvisioningError>;

    async fn create_realm(&self, realm: &str) -> Result<(), ProvisioningError>;

    async fn create_client(&self, realm: &str, client_id: &str) -> Result<(), ProvisioningError>;

    async fn create_client_scope(&self, realm: &str, name: &str) -> Result<(), ProvisioningError>;

    async fn create_realm_role(&self, realm: &str, role: &str) -> Result<(), ProvisioningError>;

    async fn create_user(
        &self,
        realm: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ProvisioningError>;
}

/// Keycloak admin REST client
pub struct KeycloakClient {
    base_url: String,
    admin_user: String,
    admin_password: String,
    http: Client,
}

impl KeycloakClient {
    pub fn new(
        base_url: impl Into<String>,
        admin_user: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            admin_user: admin_user.into(),
            admin_password: admin_password.into(),
            http: Client::new(),
        }
    }

    /// Acquire an admin token from the master realm (admin-cli client).
    async fn admin_token(&self) -> Result<String, ProvisioningError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let url = format!(
            "{}/realms/master/protocol/openid-connect/token",
            self.base_url
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", "admin-cli"),
                ("username", self.admin_user.as_str()),
                ("password", self.admin_password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<TokenResponse>().await?.access_token)
    }

    /// POST a resource representation; 409 means it already exists.
    async fn post_resource(
        &self,
        action: &'static str,
        url: String,
        body: Value,
    ) -> Result<(), ProvisioningError> {
        let token = self.admin_token().await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => {
                debug!(action, "Resource already exists");
                Ok(())
            }
            status => Err(ProvisioningError::Rejected { action, status }),
        }
    }
}

#[async_trait]
impl IdentityApi for KeycloakClient {
    async fn realm_exists(&self, realm: &str) -> Result<bool, ProvisioningError> {
        let token = self.admin_token().await?;
        let url = format!("{}/admin/realms/{}", self.base_url, realm);
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ProvisioningError::Rejected {
                action: "realm lookup",
                status,
            }),
        }
    }

    async fn create_realm(&self, realm: &str) -> Result<(), ProvisioningError> {
        self.post_resource(
            "realm creation",
            format!("{}/admin/realms", self.base_url),
            json!({
                "realm": realm,
                "enabled": true,
            }),
        )
        .await
    }

    async fn create_client(&self, realm: &str, client_id: &str) -> Result<(), ProvisioningError> {
        self.post_resource(
            "client creation",
            format!("{}/admin/realms/{}/clients", self.base_url, realm),
            json!({
                "clientId": client_id,
                "publicClient": true,
                "standardFlowEnabled": true,
                "redirectUris": ["*"],
                "webOrigins": ["*"],
            }),
        )
        .await
    }

    async fn create_client_scope(&self, realm: &str, name: &str) -> Result<(), ProvisioningError> {
        self.post_resource(
            "client scope creation",
            format!("{}/admin/realms/{}/client-scopes", self.base_url, realm),
            json!({
                "name": name,
                "protocol": "openid-connect",
            }),
        )
        .await
    }

    async fn create_realm_role(&self, realm: &str, role: &str) -> Result<(), ProvisioningError> {
        self.post_resource(
            "role creation",
            format!("{}/admin/realms/{}/roles", self.base_url, realm),
            json!({ "name": role }),
        )
        .await
    }

    async fn create_user(
        &self,
        realm: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ProvisioningError> {
        self.post_resource(
            "user creation",
            format!("{}/admin/realms/{}/users", self.base_url, realm),
            json!({
                "username": username,
                "enabled": true,
                "credentials": [{
                    "type": "password",
                    "value": password,
                    "temporary": true,
                }],
            }),
        )
        .await
    }
}

/// Provisions the identity resources the application expects.
pub struct ProvisioningService {
    api: Arc<dyn IdentityApi>,
    realm: String,
    client_id: String,
    admin_credentials: Option<(String, String)>,
}

impl ProvisioningService {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        admin_credentials: Option<(String, String)>,
    ) -> Self {
        Self {
            api,
            realm: realm.into(),
            client_id: client_id.into(),
            admin_credentials,
        }
    }

    /// Ensure realm, client, scopes, roles and the initial admin user
    /// exist. Safe to run repeatedly.
    pub async fn provision(&self) -> Result<(), ProvisioningError> {
        if self.api.realm_exists(&self.realm).await? {
            debug!(realm = %self.realm, "Realm already present");
        } else {
            info!(realm = %self.realm, "Creating realm");
            self.api.create_realm(&self.realm).await?;
        }

        self.api.create_client(&self.realm, &self.client_id).await?;

        for scope in CLIENT_SCOPES {
            self.api.create_client_scope(&self.realm, scope).await?;
        }

        for role in REALM_ROLES {
            self.api.create_realm_role(&self.realm, role).await?;
        }

        if let Some((username, password)) = &self.admin_credentials {
            self.api.create_user(&self.realm, username, password).await?;
        }

        info!(realm = %self.realm, "Identity provisioning complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeIdentityApi {
        realm_present: Mutex<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeIdentityApi {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }
    }

    #[async_trait]
    impl IdentityApi for FakeIdentityApi {
        async fn realm_exists(&self, _realm: &str) -> Result<bool, ProvisioningError> {
            Ok(*self.realm_present.lock())
        }

        async fn create_realm(&self, realm: &str) -> Result<(), ProvisioningError> {
            *self.realm_present.lock() = true;
            self.record(format!("realm:{realm}"));
            Ok(())
        }

        async fn create_client(
            &self,
            _realm: &str,
            client_id: &str,
        ) -> Result<(), ProvisioningError> {
            self.record(format!("client:{client_id}"));
            Ok(())
        }

        async fn create_client_scope(
            &self,
            _realm: &str,
            name: &str,
        ) -> Result<(), ProvisioningError> {
            self.record(format!("scope:{name}"));
            Ok(())
        }

        async fn create_realm_role(
            &self,
            _realm: &str,
            role: &str,
        ) -> Result<(), ProvisioningError> {
            self.record(format!("role:{role}"));
            Ok(())
        }

        async fn create_user(
            &self,
            _realm: &str,
            username: &str,
            _password: &str,
        ) -> Result<(), ProvisioningError> {
            self.record(format!("user:{username}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn provisions_every_resource_once() {
        let api = Arc::new(FakeIdentityApi::default());
        let service = ProvisioningService::new(
            api.clone(),
            "timekeeper",
            "timekeeper-web",
            Some(("admin".into(), "changeme".into())),
        );

        service.provision().await.unwrap();

        let calls = api.calls.lock().clone();
        assert!(calls.contains(&"realm:timekeeper".to_string()));
        assert!(calls.contains(&"client:timekeeper-web".to_string()));
        assert!(calls.contains(&"role:admin".to_string()));
        assert!(calls.contains(&"user:admin".to_string()));
    }

    #[tokio::test]
    async fn reprovisioning_skips_realm_creation() {
        let api = Arc::new(FakeIdentityApi::default());
        let service =
            ProvisioningService::new(api.clone(), "timekeeper", "timekeeper-web", None);

        service.provision().await.unwrap();
        service.provision().await.unwrap();

        let realm_creations = api
            .calls
            .lock()
            .iter()
            .filter(|c| c.starts_with("realm:"))
            .count();
        assert_eq!(realm_creations, 1);
    }
}
