// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use strongbox_core::{CredentialValue, UserParameters};

use crate::password::{generate_password, generate_username};

/// Generate a user credential. A configured username is kept verbatim.
pub fn generate_user(params: &UserParameters) -> Result<CredentialValue, String> {
    let username = match &params.username {
        Some(name) if name.trim().is_empty() => {
            return Err("username must not be blank".to_string());
        }
        Some(name) => name.clone(),
        None => generate_username(),
    };
    Ok(CredentialValue::User {
        username,
        password: generate_password(&params.password)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_username_is_kept() {
        let params = UserParameters {
            username: Some("svc-deploy".into()),
            ..Default::default()
        };
        let CredentialValue::User { username, password } = generate_user(&params).unwrap() else {
            panic!("not a user");
        };
        assert_eq!(username, "svc-deploy");
        assert_eq!(password.len(), 30);
    }

    #[test]
    fn random_usernames_differ() {
        let a = generate_user(&UserParameters::default()).unwrap();
        let b = generate_user(&UserParameters::default()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn blank_username_rejected() {
        let params = UserParameters {
            username: Some("  ".into()),
            ..Default::default()
        };
        assert!(generate_user(&params).is_err());
    }
}
