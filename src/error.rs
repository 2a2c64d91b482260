//! Error taxonomy for the injection pass.
//!
//! Three classes, all fatal for the component being processed:
//! - configuration errors: the injection point itself is declared wrongly
//!   (unsupported type, bad setter arity, unresolvable interceptor reference);
//! - construction errors: a collaborator failed while building the value
//!   (channel factory, stub constructor, interceptor constructor);
//! - invariant violations: internal errors distinct from user
//!   misconfiguration (a transformer drifted the stub type, an assigner
//!   received a mismatched value).
//!
//! Every variant names the failing member and, where one exists, the logical
//! channel name. There are no retries and no partial success.

use crate::registry::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    // configuration
    #[error("unsupported injection type {type_name} at {member}")]
    UnsupportedType {
        member: String,
        type_name: &'static str,
    },

    #[error("{member} must take exactly one parameter, found {found}")]
    SetterArity { member: String, found: usize },

    #[error("unresolved interceptor {reference} at {member}")]
    UnresolvedInterceptor {
        member: String,
        reference: String,
        #[source]
        source: Option<RegistryError>,
    },

    #[error("cannot resolve channel factory: {source}")]
    MissingChannelFactory {
        #[source]
        source: RegistryError,
    },

    // construction
    #[error("failed to create channel '{name}' for {member}")]
    ChannelCreation {
        member: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create interceptor {reference} at {member}")]
    InterceptorCreation {
        member: String,
        reference: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create client stub {type_name} over channel '{name}' for {member}")]
    StubCreation {
        member: String,
        name: String,
        type_name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    // invariant violations
    #[error("internal: injection value for channel '{name}' at {member}: {detail}")]
    Internal {
        member: String,
        name: String,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_member_and_channel() {
        let err = InjectError::ChannelCreation {
            member: "field `client`".to_owned(),
            name: "billing".to_owned(),
            source: anyhow::anyhow!("boom"),
        };
        let msg = err.to_string();
        assert!(msg.contains("field `client`"), "missing member in: {msg}");
        assert!(msg.contains("billing"), "missing channel name in: {msg}");
    }

    #[test]
    fn missing_factory_surfaces_the_registry_cause() {
        use crate::factory::ChannelFactory;
        use crate::registry::TypeKey;

        let err = InjectError::MissingChannelFactory {
            source: RegistryError::Ambiguous {
                capability: TypeKey::of::<dyn ChannelFactory>(),
                count: 2,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("ambiguous"), "missing cause in: {msg}");
        assert!(msg.contains("2 components"), "missing count in: {msg}");
    }

    #[test]
    fn unsupported_type_names_the_type() {
        let err = InjectError::UnsupportedType {
            member: "field `broken`".to_owned(),
            type_name: "alloc::string::String",
        };
        assert!(err.to_string().contains("alloc::string::String"));
    }
}
