use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::auth::session::TokenPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::User => write!(f, "USER"),
        }
    }
}

/// Cosmetic tier shown next to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeType {
    Green,
    Yellow,
}

impl std::str::FromStr for BadgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "green" => Ok(BadgeType::Green),
            "yellow" => Ok(BadgeType::Yellow),
            other => Err(format!("unknown badge type: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email")
    )]
    pub email: String,
    #[validate(length(min = 6, message = "Min 6 characters"))]
    pub password: String,
}

/// Answer to a login. Depending on the account the backend either issues
/// tokens straight away or sends a one-time code first.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub otp: Option<u32>,
}

impl LoginData {
    pub fn token_pair(&self) -> Option<TokenPair> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) => Some(TokenPair {
                access_token: access.clone(),
                refresh_token: refresh.clone(),
            }),
            _ => None,
        }
    }
}

/// Registration through an invitation PIN.
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(
        length(min = 1, message = "Required"),
        email(message = "Invalid email")
    )]
    pub email: String,
    #[validate(length(equal = 6, message = "PIN must be exactly 6 digits"))]
    pub pin: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "crate::validation::password_strength")
    )]
    pub password: String,
    #[validate(
        length(min = 1, message = "Required"),
        must_match(other = "password", message = "Passwords must match")
    )]
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterData {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OtpRequest {
    pub otp: u32,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    #[validate(
        length(min = 1, message = "Add at least one email"),
        custom(function = "crate::validation::every_email")
    )]
    pub emails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_type: Option<BadgeType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    #[serde(default)]
    pub badge: String,
}

/// A user in the referral tree together with the users they referred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub attributes: NodeAttributes,
    #[serde(default)]
    pub referrals: Option<Vec<ReferralNode>>,
}

impl ReferralNode {
    /// Number of users below this node at any depth.
    pub fn descendant_count(&self) -> usize {
        self.referrals
            .iter()
            .flatten()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Zero-based page index to offset/limit.
    pub fn from_page(page: u32, page_size: u32) -> Self {
        Self {
            skip: page.saturating_mul(page_size),
            limit: page_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub list: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Commission,
    Payout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
    Rejected,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub balance: f64,
    pub last_amount_added: f64,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub earner_id: User,
    pub referred_user_id: User,
    pub level: u32,
    pub amount: f64,
    #[serde(default)]
    pub is_paid: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Account Holder Name is required"))]
    pub account_holder_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Bank Name is required"))]
    pub bank_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Account Number is required"))]
    pub account_number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "IFSC Code is required"))]
    pub ifsc_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub blocked: Option<bool>,
    #[serde(default)]
    pub block_reason: Option<String>,
    #[serde(default)]
    pub referrer_id: Option<String>,
    #[serde(default)]
    pub badge_type: Option<BadgeType>,
    #[serde(default)]
    pub total_earnings: Option<f64>,
    #[serde(default)]
    pub direct_referral_count: Option<u32>,
    #[serde(default)]
    pub is_payout_eligible: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A user record with the bank details used for payouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
}

/// Body of `PATCH users/{id}`; only set fields are sent, and only set
/// fields are validated.
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email")
    )]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub bank_details: Option<BankDetails>,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    #[validate(range(exclusive_min = 0.0, message = "Must be positive"))]
    pub amount: f64,
    #[validate(length(min = 1, message = "User is required"))]
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_request_from_page() {
        assert_eq!(PageRequest::from_page(0, 10), PageRequest { skip: 0, limit: 10 });
        assert_eq!(PageRequest::from_page(3, 25), PageRequest { skip: 75, limit: 25 });
    }

    #[test]
    fn test_login_data_token_pair() {
        let data: LoginData = serde_json::from_value(json!({
            "accessToken": "A1",
            "refreshToken": "R1"
        }))
        .unwrap();
        assert_eq!(
            data.token_pair(),
            Some(TokenPair {
                access_token: "A1".to_string(),
                refresh_token: "R1".to_string()
            })
        );

        let otp_only: LoginData = serde_json::from_value(json!({"otp": 482913})).unwrap();
        assert_eq!(otp_only.token_pair(), None);
        assert_eq!(otp_only.otp, Some(482913));
    }

    #[test]
    fn test_referral_tree_decodes_recursively() {
        let tree: ReferralNode = serde_json::from_value(json!({
            "id": "root",
            "name": "Root",
            "email": "root@example.com",
            "attributes": {"badge": "green"},
            "referrals": [
                {
                    "id": "a",
                    "name": "A",
                    "email": "a@example.com",
                    "attributes": {"badge": "yellow"},
                    "referrals": [
                        {"id": "a1", "name": "A1", "email": "a1@example.com", "attributes": {"badge": "green"}, "referrals": null}
                    ]
                },
                {"id": "b", "name": "B", "email": "b@example.com", "attributes": {"badge": "green"}}
            ]
        }))
        .unwrap();

        assert_eq!(tree.descendant_count(), 3);
        assert_eq!(tree.attributes.badge, "green");
    }

    #[test]
    fn test_user_details_flattens_user() {
        let details: UserDetails = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Asha",
            "email": "asha@example.com",
            "role": "ADMIN",
            "badgeType": "yellow",
            "bankDetails": {
                "accountHolderName": "Asha",
                "bankName": "Bank",
                "accountNumber": "0001",
                "ifscCode": "BANK0001"
            }
        }))
        .unwrap();

        assert_eq!(details.user.id, "u1");
        assert_eq!(details.user.role, Role::Admin);
        assert_eq!(details.user.badge_type, Some(BadgeType::Yellow));
        assert_eq!(details.bank_details.unwrap().ifsc_code, "BANK0001");
    }

    #[test]
    fn test_update_user_request_omits_unset_fields() {
        let request = UpdateUserRequest {
            id: "u1".to_string(),
            name: Some("Asha".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"_id": "u1", "name": "Asha"})
        );
    }

    #[test]
    fn test_wire_names() {
        let invite = InviteRequest {
            emails: vec!["a@example.com".to_string()],
            badge_type: Some(BadgeType::Green),
        };
        assert_eq!(
            serde_json::to_value(&invite).unwrap(),
            json!({"emails": ["a@example.com"], "badgeType": "green"})
        );

        let payout = PayoutRequest {
            amount: 150.0,
            user_id: "u1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&payout).unwrap(),
            json!({"amount": 150.0, "userId": "u1"})
        );
    }
}
