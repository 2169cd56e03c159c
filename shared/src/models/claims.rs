use serde::{Deserialize, Serialize};

/// Role yang boleh mengubah, void, atau refund payment
pub const PAYMENT_SUPERVISOR_ROLES: [&str; 2] = ["admin", "manager"];

/// Role staff outlet yang boleh mencatat payment
pub const STAFF_ROLES: [&str; 3] = ["admin", "manager", "cashier"];

/// Staff outlet (kasir ke atas)
pub fn is_staff_role(role: &str) -> bool {
    STAFF_ROLES.contains(&role)
}

/// Admin atau manager, boleh amend/void/refund
pub fn can_amend_payments(role: &str) -> bool {
    PAYMENT_SUPERVISOR_ROLES.contains(&role)
}

/// Model JWT claims yang digunakan di seluruh back-office untuk authentication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    pub sub: i32,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
    pub jti: String,
}

impl TokenClaims {
    /// Cek apakah token adalah access token
    pub fn is_access_token(&self) -> bool {
        self.token_type == "access"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_claims(token_type: &str) -> TokenClaims {
        let now = chrono::Utc::now().timestamp();
        TokenClaims {
            sub: 7,
            email: "kasir@laundry.test".to_string(),
            role: "cashier".to_string(),
            exp: now + 900,
            iat: now,
            token_type: token_type.to_string(),
            jti: "jti-cashier-7".to_string(),
        }
    }

    #[test]
    fn test_is_access_token() {
        assert!(create_test_claims("access").is_access_token());
        assert!(!create_test_claims("refresh").is_access_token());
    }

    #[test]
    fn test_cashier_can_record_but_not_amend() {
        assert!(is_staff_role("cashier"));
        assert!(!can_amend_payments("cashier"));
    }

    #[test]
    fn test_manager_and_admin_can_amend() {
        assert!(is_staff_role("manager"));
        assert!(can_amend_payments("manager"));
        assert!(can_amend_payments("admin"));
    }

    #[test]
    fn test_unknown_role_is_not_staff() {
        assert!(!is_staff_role("customer"));
        assert!(!can_amend_payments("customer"));
        assert!(!can_amend_payments(""));
    }
}
