//! Capability-keyed component registry.
//!
//! The registry is the service-locator seam between this crate and the host
//! application: the channel factory, client interceptors, and stub transformers
//! are all registered here and resolved during injection. Entries are kept in
//! registration order per capability, and may optionally carry a name.
//!
//! Implementation details:
//! - Key = capability type name via `type_name::<C>()`, which works for
//!   `C = dyn Trait`.
//! - Value = `Arc<C>` stored as `Box<dyn Any + Send + Sync>` (downcast on read).
//! - Re-registering under the same name overwrites that entry; anonymous
//!   registrations always append.

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// Stable type key for capabilities, including trait objects.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TypeKey(&'static str);

impl TypeKey {
    #[inline]
    pub(crate) fn of<C: ?Sized + 'static>() -> Self {
        TypeKey(std::any::type_name::<C>())
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no component registered for capability {capability:?}")]
    NotFound { capability: TypeKey },

    #[error("capability {capability:?} is ambiguous: {count} components registered")]
    Ambiguous { capability: TypeKey, count: usize },

    #[error("no component named '{name}' registered for capability {capability:?}")]
    NamedNotFound { capability: TypeKey, name: String },

    #[error("stored component does not match capability {capability:?}")]
    TypeMismatch { capability: TypeKey },
}

type Boxed = Box<dyn Any + Send + Sync>;

struct Entry {
    name: Option<Arc<str>>,
    value: Boxed,
}

/// Ordered, capability-keyed registry of shared components.
pub struct ComponentRegistry {
    map: RwLock<HashMap<TypeKey, Vec<Entry>>>,
}

impl ComponentRegistry {
    #[inline]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Register an anonymous component under the capability `C`.
    /// `C` can be a trait object like `dyn ClientInterceptor`.
    pub fn register<C>(&self, component: Arc<C>)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.insert::<C>(None, component);
    }

    /// Register a named component under the capability `C`.
    /// Registering the same name again replaces the previous entry in place.
    pub fn register_named<C>(&self, name: impl Into<Arc<str>>, component: Arc<C>)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.insert::<C>(Some(name.into()), component);
    }

    fn insert<C>(&self, name: Option<Arc<str>>, component: Arc<C>)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let mut w = self.map.write();
        let entries = w.entry(TypeKey::of::<C>()).or_default();
        if let Some(n) = &name {
            if let Some(existing) = entries.iter_mut().find(|e| e.name.as_deref() == Some(&**n)) {
                existing.value = Box::new(component);
                return;
            }
        }
        entries.push(Entry {
            name,
            value: Box::new(component),
        });
    }

    /// Fetch the single component registered for `C`.
    ///
    /// Fails with [`RegistryError::NotFound`] when nothing is registered and
    /// with [`RegistryError::Ambiguous`] when more than one entry exists.
    pub fn get_one<C>(&self) -> Result<Arc<C>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = TypeKey::of::<C>();
        let r = self.map.read();
        let entries = r
            .get(&capability)
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| RegistryError::NotFound {
                capability: capability.clone(),
            })?;
        if entries.len() > 1 {
            return Err(RegistryError::Ambiguous {
                capability,
                count: entries.len(),
            });
        }
        downcast(&entries[0], capability)
    }

    /// Fetch every component registered for `C`, in registration order.
    pub fn get_all<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let r = self.map.read();
        r.get(&TypeKey::of::<C>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.value.downcast_ref::<Arc<C>>().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fetch the component registered for `C` under `name`.
    pub fn get_named<C>(&self, name: &str) -> Result<Arc<C>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = TypeKey::of::<C>();
        let r = self.map.read();
        let entry = r
            .get(&capability)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|e| e.name.as_deref() == Some(name))
            })
            .ok_or_else(|| RegistryError::NamedNotFound {
                capability: capability.clone(),
                name: name.to_owned(),
            })?;
        downcast(entry, capability)
    }

    /// Whether at least one component is registered for `C`.
    pub fn has_any<C>(&self) -> bool
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let r = self.map.read();
        r.get(&TypeKey::of::<C>())
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Total number of entries across all capabilities.
    pub fn len(&self) -> usize {
        self.map.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear everything (useful in tests).
    pub fn clear(&self) {
        self.map.write().clear();
    }
}

fn downcast<C>(entry: &Entry, capability: TypeKey) -> Result<Arc<C>, RegistryError>
where
    C: ?Sized + Send + Sync + 'static,
{
    // Stored value is exactly `Arc<C>`; anything else is a registry bug.
    entry
        .value
        .downcast_ref::<Arc<C>>()
        .cloned()
        .ok_or(RegistryError::TypeMismatch { capability })
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Hello(&'static str);
    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello from {}", self.0)
        }
    }

    #[test]
    fn register_and_get_one() {
        let registry = ComponentRegistry::new();
        let greeter: Arc<dyn Greeter> = Arc::new(Hello("a"));
        registry.register::<dyn Greeter>(greeter.clone());

        let got = registry.get_one::<dyn Greeter>().unwrap();
        assert_eq!(got.greet(), "hello from a");
        assert!(Arc::ptr_eq(&greeter, &got), "get_one must return the registered instance");
    }

    #[test]
    fn get_one_fails_when_empty() {
        let registry = ComponentRegistry::new();
        let err = registry.get_one::<dyn Greeter>().map(|_| ()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
        assert!(
            format!("{err}").contains("Greeter"),
            "error should name the capability: {err}"
        );
    }

    #[test]
    fn get_one_fails_on_ambiguity() {
        let registry = ComponentRegistry::new();
        registry.register::<dyn Greeter>(Arc::new(Hello("a")));
        registry.register::<dyn Greeter>(Arc::new(Hello("b")));

        let err = registry.get_one::<dyn Greeter>().map(|_| ()).unwrap_err();
        assert!(matches!(err, RegistryError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn get_all_preserves_registration_order() {
        let registry = ComponentRegistry::new();
        registry.register::<dyn Greeter>(Arc::new(Hello("first")));
        registry.register_named::<dyn Greeter>("mid", Arc::new(Hello("second")));
        registry.register::<dyn Greeter>(Arc::new(Hello("third")));

        let all = registry.get_all::<dyn Greeter>();
        let greetings: Vec<_> = all.iter().map(|g| g.greet()).collect();
        assert_eq!(
            greetings,
            vec![
                "hello from first",
                "hello from second",
                "hello from third"
            ]
        );
    }

    #[test]
    fn get_named_resolves_and_misses() {
        let registry = ComponentRegistry::new();
        registry.register_named::<dyn Greeter>("main", Arc::new(Hello("main")));

        let got = registry.get_named::<dyn Greeter>("main").unwrap();
        assert_eq!(got.greet(), "hello from main");

        let err = registry.get_named::<dyn Greeter>("other").map(|_| ()).unwrap_err();
        assert!(matches!(err, RegistryError::NamedNotFound { .. }));
        assert!(format!("{err}").contains("other"));
    }

    #[test]
    fn named_re_registration_overwrites_in_place() {
        let registry = ComponentRegistry::new();
        registry.register_named::<dyn Greeter>("slot", Arc::new(Hello("old")));
        registry.register_named::<dyn Greeter>("slot", Arc::new(Hello("new")));

        assert_eq!(registry.len(), 1, "overwrite must not grow the entry list");
        let got = registry.get_named::<dyn Greeter>("slot").unwrap();
        assert_eq!(got.greet(), "hello from new");
    }

    #[test]
    fn capabilities_are_independent() {
        trait Other: Send + Sync {}
        struct Impl;
        impl Other for Impl {}

        let registry = ComponentRegistry::new();
        registry.register::<dyn Greeter>(Arc::new(Hello("a")));
        registry.register::<dyn Other>(Arc::new(Impl));

        assert!(registry.has_any::<dyn Greeter>());
        assert!(registry.has_any::<dyn Other>());
        assert_eq!(registry.get_all::<dyn Greeter>().len(), 1);
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.has_any::<dyn Greeter>());
    }
}
