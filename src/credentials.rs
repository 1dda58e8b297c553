use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the logged-in user as reported by CouchDB (`userCtx`).
///
/// Fields other than `name` and `roles` are kept as-is in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserContext {
    pub fn named<N: Into<String>>(name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// CouchDB reports anonymous sessions with a `null` name.
    pub fn is_anonymous(&self) -> bool {
        self.name.as_deref().is_none_or(str::is_empty)
    }
}

/// The identity handed to request handlers once a session has been accepted.
///
/// Produced from a [`UserContext`] directly, or supplied by a
/// [`Validator`](crate::Validator) that replaced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    #[must_use]
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl From<UserContext> for Credentials {
    fn from(user: UserContext) -> Self {
        Self {
            name: user.name,
            roles: user.roles,
            extra: user.extra,
        }
    }
}

impl From<&UserContext> for Credentials {
    fn from(user: &UserContext) -> Self {
        user.clone().into()
    }
}
