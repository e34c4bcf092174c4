//! User records: credentials, permission dimensions, and the rule grammar.
//!
//! A user is the unit of policy. Permissions live in include/exclude list
//! pairs per dimension (categories, commands, keys, read-keys, write-keys,
//! pub/sub channels). `"*"` inside an included list means "all"; inside an
//! excluded list it vetoes the whole dimension. Categories and commands are
//! lower-cased on storage so later comparisons can be exact.

use serde::{Deserialize, Serialize, de};
use sha2::{Digest, Sha256};

use super::errors::AclError;

/// The user every registry contains and every fresh connection starts as.
pub const DEFAULT_USERNAME: &str = "default";

/// Compute the hex form of the SHA-256 digest representation of a password.
pub(crate) fn sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// The stored representation of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Plaintext,
    Sha256,
}

impl CredentialKind {
    /// Canonical serialized name of this representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Plaintext => "plaintext",
            CredentialKind::Sha256 => "SHA256",
        }
    }

    /// Parse a representation name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plaintext" => Some(CredentialKind::Plaintext),
            "sha256" => Some(CredentialKind::Sha256),
            _ => None,
        }
    }
}

impl Serialize for CredentialKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CredentialKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CredentialKind::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown password type: {raw}")))
    }
}

/// A single stored secret.
///
/// Equality for authentication requires the same representation and the same
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The representation of `value`.
    #[serde(rename = "PasswordType")]
    pub kind: CredentialKind,

    /// The secret itself: the literal password, or its hex SHA-256 digest.
    #[serde(rename = "PasswordValue")]
    pub value: String,
}

impl Credential {
    /// A plaintext credential.
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self {
            kind: CredentialKind::Plaintext,
            value: value.into(),
        }
    }

    /// A digest credential. The digest is stored lower-cased so it compares
    /// equal to the hex the authenticator computes.
    pub fn sha256(value: impl AsRef<str>) -> Self {
        Self {
            kind: CredentialKind::Sha256,
            value: value.as_ref().to_ascii_lowercase(),
        }
    }
}

/// The unit of policy.
///
/// The serialized field names are the persisted file format; see the
/// persistence module for the load/save entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    /// Unique, immutable identifier. Mutation replaces fields, never renames.
    pub username: String,

    /// Disabled users can never authenticate.
    pub enabled: bool,

    /// Sessions bound to this user are authenticated without an AUTH call.
    pub no_password: bool,

    /// Advisory flag surfaced in introspection; key checks stay driven by
    /// the key lists.
    pub no_keys: bool,

    #[serde(rename = "Passwords")]
    pub credentials: Vec<Credential>,

    pub included_categories: Vec<String>,
    pub excluded_categories: Vec<String>,
    pub included_commands: Vec<String>,
    pub excluded_commands: Vec<String>,
    pub included_keys: Vec<String>,
    pub included_read_keys: Vec<String>,
    pub included_write_keys: Vec<String>,
    pub included_pub_sub_channels: Vec<String>,
    pub excluded_pub_sub_channels: Vec<String>,
}

impl Default for User {
    fn default() -> Self {
        User::new(String::new())
    }
}

impl User {
    /// Create an enabled user with no credentials and empty permission lists.
    ///
    /// Empty included lists deny everything; empty excluded lists deny
    /// nothing.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            enabled: true,
            no_password: false,
            no_keys: false,
            credentials: Vec::new(),
            included_categories: Vec::new(),
            excluded_categories: Vec::new(),
            included_commands: Vec::new(),
            excluded_commands: Vec::new(),
            included_keys: Vec::new(),
            included_read_keys: Vec::new(),
            included_write_keys: Vec::new(),
            included_pub_sub_channels: Vec::new(),
            excluded_pub_sub_channels: Vec::new(),
        }
    }

    /// Bring a user into canonical form.
    ///
    /// Categories and commands are lower-cased, digest credential values are
    /// lower-cased, and every list is deduplicated with first-occurrence
    /// order preserved. `"*"` entries pass through verbatim.
    pub fn normalize(&mut self) {
        lowercase_all(&mut self.included_categories);
        lowercase_all(&mut self.excluded_categories);
        lowercase_all(&mut self.included_commands);
        lowercase_all(&mut self.excluded_commands);

        for credential in &mut self.credentials {
            if credential.kind == CredentialKind::Sha256 {
                credential.value = credential.value.to_ascii_lowercase();
            }
        }

        dedupe(&mut self.included_categories);
        dedupe(&mut self.excluded_categories);
        dedupe(&mut self.included_commands);
        dedupe(&mut self.excluded_commands);
        dedupe(&mut self.included_keys);
        dedupe(&mut self.included_read_keys);
        dedupe(&mut self.included_write_keys);
        dedupe(&mut self.included_pub_sub_channels);
        dedupe(&mut self.excluded_pub_sub_channels);

        let mut seen: Vec<Credential> = Vec::new();
        self.credentials.retain(|c| {
            if seen.contains(c) {
                false
            } else {
                seen.push(c.clone());
                true
            }
        });
    }

    /// Apply a SETUSER rule stream, left to right.
    ///
    /// Later tokens override earlier ones for the same field. Adding `"*"`
    /// to one side of a dimension clears the opposite side.
    pub fn apply_rules(&mut self, tokens: &[String]) -> Result<(), AclError> {
        for token in tokens {
            match token.to_ascii_lowercase().as_str() {
                "on" => {
                    self.enabled = true;
                    continue;
                }
                "off" => {
                    self.enabled = false;
                    continue;
                }
                "nopass" => {
                    self.credentials.clear();
                    self.no_password = true;
                    continue;
                }
                "resetpass" => {
                    self.credentials.clear();
                    self.no_password = false;
                    continue;
                }
                "nokeys" => {
                    self.no_keys = true;
                    continue;
                }
                _ => {}
            }

            if let Some(secret) = token.strip_prefix('>') {
                self.credentials.push(Credential::plaintext(secret));
            } else if let Some(digest) = token.strip_prefix('#') {
                self.credentials.push(Credential::sha256(digest));
            } else if let Some(category) = token.strip_prefix("+@") {
                add_rule(
                    &mut self.included_categories,
                    &mut self.excluded_categories,
                    &category.to_ascii_lowercase(),
                );
            } else if let Some(category) = token.strip_prefix("-@") {
                add_rule(
                    &mut self.excluded_categories,
                    &mut self.included_categories,
                    &category.to_ascii_lowercase(),
                );
            } else if let Some(channel) = token.strip_prefix("+&") {
                add_rule(
                    &mut self.included_pub_sub_channels,
                    &mut self.excluded_pub_sub_channels,
                    channel,
                );
            } else if let Some(channel) = token.strip_prefix("-&") {
                add_rule(
                    &mut self.excluded_pub_sub_channels,
                    &mut self.included_pub_sub_channels,
                    channel,
                );
            } else if let Some(pattern) = strip_prefix_ignore_case(token, "%rw~") {
                push_unique(&mut self.included_keys, pattern);
            } else if let Some(pattern) = strip_prefix_ignore_case(token, "%r~") {
                push_unique(&mut self.included_read_keys, pattern);
            } else if let Some(pattern) = strip_prefix_ignore_case(token, "%w~") {
                push_unique(&mut self.included_write_keys, pattern);
            } else if let Some(command) = token.strip_prefix('+') {
                add_rule(
                    &mut self.included_commands,
                    &mut self.excluded_commands,
                    &command.to_ascii_lowercase(),
                );
            } else if let Some(command) = token.strip_prefix('-') {
                add_rule(
                    &mut self.excluded_commands,
                    &mut self.included_commands,
                    &command.to_ascii_lowercase(),
                );
            } else {
                return Err(AclError::InvalidRule {
                    token: token.clone(),
                });
            }
        }
        Ok(())
    }

    /// Union `incoming`'s permission lists and credentials into this user.
    ///
    /// The enable, no-password, and no-keys flags take the incoming values.
    pub fn merge(&mut self, incoming: &User) {
        self.enabled = incoming.enabled;
        self.no_password = incoming.no_password;
        self.no_keys = incoming.no_keys;

        for credential in &incoming.credentials {
            if !self.credentials.contains(credential) {
                self.credentials.push(credential.clone());
            }
        }

        union(&mut self.included_categories, &incoming.included_categories);
        union(&mut self.excluded_categories, &incoming.excluded_categories);
        union(&mut self.included_commands, &incoming.included_commands);
        union(&mut self.excluded_commands, &incoming.excluded_commands);
        union(&mut self.included_keys, &incoming.included_keys);
        union(&mut self.included_read_keys, &incoming.included_read_keys);
        union(&mut self.included_write_keys, &incoming.included_write_keys);
        union(
            &mut self.included_pub_sub_channels,
            &incoming.included_pub_sub_channels,
        );
        union(
            &mut self.excluded_pub_sub_channels,
            &incoming.excluded_pub_sub_channels,
        );
    }

    /// Overwrite every field with `incoming`'s, preserving the username.
    pub fn replace(&mut self, incoming: &User) {
        let username = std::mem::take(&mut self.username);
        *self = incoming.clone();
        self.username = username;
    }

    /// Render this user as one line of SETUSER rules, the ACL LIST format.
    pub fn rule_line(&self) -> String {
        let mut line = self.username.clone();

        line.push_str(if self.enabled { " on" } else { " off" });
        if self.no_password {
            line.push_str(" nopass");
        }
        if self.no_keys {
            line.push_str(" nokeys");
        }

        for credential in &self.credentials {
            match credential.kind {
                CredentialKind::Plaintext => line.push_str(&format!(" >{}", credential.value)),
                CredentialKind::Sha256 => line.push_str(&format!(" #{}", credential.value)),
            }
        }

        for category in &self.included_categories {
            line.push_str(&format!(" +@{}", wildcard_name(category)));
        }
        for category in &self.excluded_categories {
            line.push_str(&format!(" -@{}", wildcard_name(category)));
        }
        for command in &self.included_commands {
            line.push_str(&format!(" +{}", wildcard_name(command)));
        }
        for command in &self.excluded_commands {
            line.push_str(&format!(" -{}", wildcard_name(command)));
        }
        for key in &self.included_keys {
            line.push_str(&format!(" %RW~{key}"));
        }
        for key in &self.included_read_keys {
            line.push_str(&format!(" %R~{key}"));
        }
        for key in &self.included_write_keys {
            line.push_str(&format!(" %W~{key}"));
        }
        for channel in &self.included_pub_sub_channels {
            line.push_str(&format!(" +&{channel}"));
        }
        for channel in &self.excluded_pub_sub_channels {
            line.push_str(&format!(" -&{channel}"));
        }

        line
    }
}

/// `"*"` renders as `all` in rule listings.
fn wildcard_name(entry: &str) -> &str {
    if entry == "*" { "all" } else { entry }
}

fn lowercase_all(list: &mut [String]) {
    for entry in list.iter_mut() {
        *entry = entry.to_ascii_lowercase();
    }
}

fn dedupe(list: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    list.retain(|entry| seen.insert(entry.clone()));
}

fn push_unique(list: &mut Vec<String>, entry: &str) {
    if !list.iter().any(|e| e == entry) {
        list.push(entry.to_string());
    }
}

/// Add `entry` to `target`; a wildcard clears the opposite side of the
/// dimension.
fn add_rule(target: &mut Vec<String>, opposite: &mut Vec<String>, entry: &str) {
    if entry == "*" {
        opposite.clear();
    }
    push_unique(target, entry);
}

fn union(target: &mut Vec<String>, incoming: &[String]) {
    for entry in incoming {
        push_unique(target, entry);
    }
}

fn strip_prefix_ignore_case<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let head = token.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&token[prefix.len()..])
    } else {
        None
    }
}
