//! Stub transformer capability.
//!
//! Transformers post-process a freshly constructed client stub before it is
//! assigned, e.g. to attach per-service call options or deadlines. They are
//! discovered once from the [`crate::ComponentRegistry`] and applied in
//! registration order. A transformer must return a value of the same concrete
//! type it received; the injector enforces this.

use std::any::Any;
use std::marker::PhantomData;

/// A type-erased client stub in transit through the transformer pipeline.
pub type BoxedStub = Box<dyn Any + Send>;

/// Post-processes a constructed stub for the given logical channel name.
pub trait StubTransformer: Send + Sync + 'static {
    fn transform(&self, name: &str, stub: BoxedStub) -> BoxedStub;
}

/// Adapter for transformers that only care about one concrete stub type.
///
/// Stubs of any other type pass through untouched, so a registry can hold
/// transformers for several client types side by side.
pub struct TypedStubTransformer<S, F> {
    apply: F,
    _stub: PhantomData<fn(S) -> S>,
}

impl<S, F> TypedStubTransformer<S, F>
where
    S: Send + 'static,
    F: Fn(&str, S) -> S + Send + Sync + 'static,
{
    pub fn new(apply: F) -> Self {
        Self {
            apply,
            _stub: PhantomData,
        }
    }
}

impl<S, F> StubTransformer for TypedStubTransformer<S, F>
where
    S: Send + 'static,
    F: Fn(&str, S) -> S + Send + Sync + 'static,
{
    fn transform(&self, name: &str, stub: BoxedStub) -> BoxedStub {
        match stub.downcast::<S>() {
            Ok(stub) => Box::new((self.apply)(name, *stub)),
            Err(other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_transformer_applies_to_matching_stub() {
        let transformer =
            TypedStubTransformer::<String, _>::new(|name, stub| format!("{stub}+{name}"));

        let out = transformer.transform("echo", Box::new("stub".to_owned()));
        let out = out.downcast::<String>().unwrap();
        assert_eq!(*out, "stub+echo");
    }

    #[test]
    fn typed_transformer_passes_other_types_through() {
        let transformer = TypedStubTransformer::<String, _>::new(|_, stub| stub);

        let out = transformer.transform("echo", Box::new(7u32));
        let out = out.downcast::<u32>().unwrap();
        assert_eq!(*out, 7);
    }
}
