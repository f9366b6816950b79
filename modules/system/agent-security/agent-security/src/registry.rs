//! Flavor-to-factory registry.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use agent_security_sdk::{AuthFlavor, CredentialRequestFactory};
use thiserror::Error;

/// Error returned by [`parse_flavor_names`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlavorParseError {
    #[error("auth string {0} is not recognized")]
    Unrecognized(String),
}

/// Maps each flavor to the one factory that serves it.
///
/// Built once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct FlavorRegistry {
    factories: HashMap<AuthFlavor, Arc<dyn CredentialRequestFactory>>,
}

impl FlavorRegistry {
    /// Build the registry from the compiled-in factories.
    ///
    /// # Panics
    ///
    /// Panics if two factories report the same flavor. That is a build
    /// defect and the agent must not start with it.
    #[must_use]
    pub fn build(factories: Vec<Arc<dyn CredentialRequestFactory>>) -> Self {
        let mut map = HashMap::with_capacity(factories.len());
        for factory in factories {
            let flavor = factory.flavor();
            match map.entry(flavor) {
                Entry::Occupied(_) => panic!(
                    "multiple authentication methods with the flavor `{flavor}` were registered; \
                     each credential request factory must report a unique flavor"
                ),
                Entry::Vacant(slot) => {
                    slot.insert(factory);
                }
            }
        }
        Self { factories: map }
    }

    /// Factory registered for `flavor`, if any.
    #[must_use]
    pub fn resolve(&self, flavor: AuthFlavor) -> Option<Arc<dyn CredentialRequestFactory>> {
        self.factories.get(&flavor).cloned()
    }

    /// Registered flavors in ascending order.
    #[must_use]
    pub fn flavors(&self) -> Vec<AuthFlavor> {
        let mut flavors: Vec<_> = self.factories.keys().copied().collect();
        flavors.sort_unstable();
        flavors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Convert configuration names such as `"SYS"` to flavors.
///
/// # Errors
///
/// `Unrecognized` on the first unknown name; no partial list is returned.
pub fn parse_flavor_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<AuthFlavor>, FlavorParseError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            AuthFlavor::from_str_name(&format!("AUTH_{name}"))
                .ok_or_else(|| FlavorParseError::Unrecognized(name.to_owned()))
        })
        .collect()
}
