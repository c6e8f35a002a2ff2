use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed role set. There is no dynamic role storage; adding a role is a
/// code change together with its capability rows below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "manager")]
    Manager,
    #[serde(rename = "comptable")]
    Accountant,
    #[serde(rename = "support")]
    Support,
    #[serde(rename = "technicien")]
    Technician,
    #[serde(rename = "utilisateur")]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Accountant => "comptable",
            Role::Support => "support",
            Role::Technician => "technicien",
            Role::User => "utilisateur",
        }
    }

    /// Static capability table. Handlers re-derive every decision from the
    /// request's claims; nothing is cached between requests.
    pub fn allows(&self, capability: Capability) -> bool {
        use Capability::*;
        use Role::*;
        match capability {
            ManageCatalog => matches!(self, Admin | Manager),
            Invoicing => matches!(self, Admin | Manager | Accountant),
            ManageSales => matches!(self, Admin | Manager),
            ManageUsers => matches!(self, Admin | Support),
            // Support owns operational settings; admin is deliberately absent.
            ManageSettings => matches!(self, Support),
            ViewTools => matches!(self, Admin | Manager | Technician),
            ManageTools => matches!(self, Admin | Manager),
            ViewReports => matches!(self, Admin | Manager | Accountant),
        }
    }
}

/// What a role is allowed to do, one row per guarded surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Clients, products and manual stock adjustments.
    ManageCatalog,
    /// Invoice create/send/pay and payment recording.
    Invoicing,
    /// Quotes, opportunities, orders, invoice cancel and delete.
    ManageSales,
    /// User administration.
    ManageUsers,
    /// Company settings and the exchange rate.
    ManageSettings,
    /// Tool catalog and assignment visibility.
    ViewTools,
    /// Assigning, restocking and accepting returns of tools.
    ManageTools,
    /// The aggregate stats surface.
    ViewReports,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    pub password_hash: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        display_name: String,
        role: Role,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            display_name,
            role,
            active: true,
            password_hash,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_manages_catalog_sales_and_users_but_not_settings() {
        assert!(Role::Admin.allows(Capability::ManageCatalog));
        assert!(Role::Admin.allows(Capability::ManageSales));
        assert!(Role::Admin.allows(Capability::ManageUsers));
        assert!(Role::Admin.allows(Capability::ManageTools));
        assert!(!Role::Admin.allows(Capability::ManageSettings));
    }

    #[test]
    fn support_owns_settings_and_users_only() {
        assert!(Role::Support.allows(Capability::ManageSettings));
        assert!(Role::Support.allows(Capability::ManageUsers));
        assert!(!Role::Support.allows(Capability::ManageCatalog));
        assert!(!Role::Support.allows(Capability::Invoicing));
        assert!(!Role::Support.allows(Capability::ViewTools));
    }

    #[test]
    fn accountant_invoices_and_reads_reports_only() {
        assert!(Role::Accountant.allows(Capability::Invoicing));
        assert!(Role::Accountant.allows(Capability::ViewReports));
        assert!(!Role::Accountant.allows(Capability::ManageSales));
        assert!(!Role::Accountant.allows(Capability::ManageCatalog));
        assert!(!Role::Accountant.allows(Capability::ManageUsers));
    }

    #[test]
    fn technician_sees_tools_but_mutates_nothing() {
        assert!(Role::Technician.allows(Capability::ViewTools));
        assert!(!Role::Technician.allows(Capability::ManageTools));
        assert!(!Role::Technician.allows(Capability::ManageCatalog));
        assert!(!Role::Technician.allows(Capability::Invoicing));
    }

    #[test]
    fn plain_user_has_no_capabilities() {
        for capability in [
            Capability::ManageCatalog,
            Capability::Invoicing,
            Capability::ManageSales,
            Capability::ManageUsers,
            Capability::ManageSettings,
            Capability::ViewTools,
            Capability::ManageTools,
            Capability::ViewReports,
        ] {
            assert!(!Role::User.allows(capability));
        }
    }

    #[test]
    fn role_uses_french_wire_names() {
        assert_eq!(
            serde_json::to_string(&Role::Accountant).unwrap(),
            "\"comptable\""
        );
        let parsed: Role = serde_json::from_str("\"technicien\"").unwrap();
        assert_eq!(parsed, Role::Technician);
    }
}
