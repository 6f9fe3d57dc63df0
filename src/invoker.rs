//! Injected invocation
//!
//! Calls functions and constructors with arguments resolved from a
//! container. Each callable declares its parameters up front as an ordered
//! list of [`TypeKey`]s; [`invoke`] resolves them in order and hands the
//! values to the callable positionally.
//!
//! Parameter keys are always untagged. Tags select explicit registrations,
//! not positional parameters.
//!
//! # Example
//!
//! ```rust
//! use bindery::invoker::{construct, Constructible, Constructor};
//! use bindery::{BindingConfig, Container, Registrar};
//! use std::sync::Arc;
//!
//! struct Database;
//! struct Logger;
//!
//! struct UserService {
//!     db: Arc<Database>,
//!     logger: Arc<Logger>,
//! }
//!
//! impl Constructible for UserService {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new("UserService::new", |db: Arc<Database>, logger: Arc<Logger>| {
//!             UserService { db, logger }
//!         })]
//!     }
//! }
//!
//! let container = Container::new();
//! let registrar = Registrar::new(&container);
//! registrar.register(BindingConfig::single().singleton(), "app", || Database).unwrap();
//! registrar.register(BindingConfig::single(), "app", || Logger).unwrap();
//! container.freeze();
//!
//! let service = construct::<UserService, _>(&container).unwrap();
//! ```

use crate::container::Container;
use crate::factory::AnyValue;
use crate::key::TypeKey;
use crate::provider::Injectable;
use crate::{DiError, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

// =============================================================================
// Resolver
// =============================================================================

/// Source of values for callable parameters.
pub trait Resolver {
    /// Resolve the value bound under `key`.
    fn resolve_key(&self, key: &TypeKey) -> Result<AnyValue>;
}

impl Resolver for Container {
    #[inline]
    fn resolve_key(&self, key: &TypeKey) -> Result<AnyValue> {
        self.resolve(key)
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// Resolved arguments, consumed in declaration order.
pub struct Arguments {
    values: std::vec::IntoIter<AnyValue>,
    position: usize,
}

impl Arguments {
    fn new(values: Vec<AnyValue>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument as a `T`.
    pub fn next<T: Injectable>(&mut self) -> Result<Arc<T>> {
        let position = self.position;
        self.position += 1;

        let mismatch = || DiError::ArgumentMismatch {
            position,
            expected: std::any::type_name::<T>(),
        };
        self.values
            .next()
            .ok_or_else(mismatch)?
            .downcast::<T>()
            .map_err(|_| mismatch())
    }

    /// Number of arguments not yet taken.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

// =============================================================================
// Callable
// =============================================================================

type Body<R, Recv> = Box<dyn Fn(Option<&Recv>, Arguments) -> Result<R> + Send + Sync>;

/// A function or method with declared parameter keys.
///
/// `Recv` is the receiver type for methods; plain functions use `()`.
pub struct Callable<R, Recv = ()> {
    name: &'static str,
    parameters: Vec<TypeKey>,
    body: Body<R, Recv>,
}

impl<R: 'static, Recv: 'static> Callable<R, Recv> {
    /// Build a callable from an explicit parameter list and body.
    ///
    /// The body receives the receiver (if one was passed to [`invoke`]) and
    /// one argument per entry of `parameters`, in the same order.
    pub fn new<F>(name: &'static str, parameters: Vec<TypeKey>, body: F) -> Self
    where
        F: Fn(Option<&Recv>, Arguments) -> Result<R> + Send + Sync + 'static,
    {
        Self {
            name,
            parameters,
            body: Box::new(body),
        }
    }

    /// A method taking `&Recv` followed by `Arc<_>` parameters.
    ///
    /// Invoking it without a receiver fails with [`DiError::MissingReceiver`].
    pub fn method<Args, F>(name: &'static str, f: F) -> Self
    where
        F: InjectMethod<Recv, Args, R>,
    {
        Self {
            name,
            parameters: F::parameters(),
            body: Box::new(move |receiver: Option<&Recv>, mut args: Arguments| {
                let receiver = receiver.ok_or(DiError::MissingReceiver { callable: name })?;
                f.call(receiver, &mut args)
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn parameters(&self) -> &[TypeKey] {
        &self.parameters
    }
}

impl<R: 'static> Callable<R> {
    /// A function whose parameters are all `Arc<_>`.
    ///
    /// The parameter keys are taken from the closure signature.
    pub fn function<Args, F>(name: &'static str, f: F) -> Self
    where
        F: InjectFn<Args, R>,
    {
        Self {
            name,
            parameters: F::parameters(),
            body: Box::new(move |_: Option<&()>, mut args: Arguments| f.call(&mut args)),
        }
    }
}

impl<R, Recv> std::fmt::Debug for Callable<R, Recv> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Functions callable with injected `Arc<_>` arguments.
///
/// Implemented for `Fn(Arc<A>, Arc<B>, ..) -> R` with up to 8 parameters.
pub trait InjectFn<Args, R>: Send + Sync + 'static {
    fn parameters() -> Vec<TypeKey>;
    fn call(&self, args: &mut Arguments) -> Result<R>;
}

/// Methods callable with a receiver and injected `Arc<_>` arguments.
///
/// Implemented for `Fn(&Recv, Arc<A>, Arc<B>, ..) -> R` with up to 8 parameters.
pub trait InjectMethod<Recv, Args, R>: Send + Sync + 'static {
    fn parameters() -> Vec<TypeKey>;
    fn call(&self, receiver: &Recv, args: &mut Arguments) -> Result<R>;
}

macro_rules! impl_inject {
    ($($T:ident),*) => {
        impl<Func, R, $($T),*> InjectFn<($($T,)*), R> for Func
        where
            Func: Fn($(Arc<$T>),*) -> R + Send + Sync + 'static,
            $($T: Injectable,)*
        {
            fn parameters() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$T>()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, args: &mut Arguments) -> Result<R> {
                $(let $T = args.next::<$T>()?;)*
                Ok((self)($($T),*))
            }
        }

        impl<Func, Recv, R, $($T),*> InjectMethod<Recv, ($($T,)*), R> for Func
        where
            Func: Fn(&Recv, $(Arc<$T>),*) -> R + Send + Sync + 'static,
            $($T: Injectable,)*
        {
            fn parameters() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$T>()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, receiver: &Recv, args: &mut Arguments) -> Result<R> {
                $(let $T = args.next::<$T>()?;)*
                Ok((self)(receiver, $($T),*))
            }
        }
    };
}

impl_inject!();
impl_inject!(A);
impl_inject!(A, B);
impl_inject!(A, B, C);
impl_inject!(A, B, C, D);
impl_inject!(A, B, C, D, E);
impl_inject!(A, B, C, D, E, F);
impl_inject!(A, B, C, D, E, F, G);
impl_inject!(A, B, C, D, E, F, G, H);

// =============================================================================
// Invocation
// =============================================================================

/// Resolve every parameter of `callable` and call it.
///
/// All parameters are resolved before the callable runs; if any key is not
/// bound, the call fails with [`DiError::UnresolvedDependency`] naming the
/// parameter and the callable is never entered. Other resolver errors
/// propagate unchanged.
pub fn invoke<R, Recv, Res>(
    callable: &Callable<R, Recv>,
    resolver: &Res,
    receiver: Option<&Recv>,
) -> Result<R>
where
    Res: Resolver + ?Sized,
{
    #[cfg(feature = "logging")]
    trace!(
        target: "bindery",
        callable = callable.name,
        parameters = callable.parameters.len(),
        "Invoking with injected arguments"
    );

    let values = callable
        .parameters
        .iter()
        .enumerate()
        .map(|(position, key)| {
            resolver.resolve_key(key).map_err(|err| match err {
                DiError::NotFound { key: missing } if missing == *key => {
                    DiError::UnresolvedDependency {
                        callable: callable.name,
                        position,
                        key: missing,
                    }
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    (callable.body)(receiver, Arguments::new(values))
}

// =============================================================================
// Constructors
// =============================================================================

/// One way to build a `T` from injected arguments.
pub struct Constructor<T> {
    callable: Callable<T>,
    inject: bool,
}

impl<T: Injectable> Constructor<T> {
    pub fn new<Args, F>(name: &'static str, f: F) -> Self
    where
        F: InjectFn<Args, T>,
    {
        Self {
            callable: Callable::function(name, f),
            inject: false,
        }
    }

    /// Build from an explicit callable.
    pub fn from_callable(callable: Callable<T>) -> Self {
        Self {
            callable,
            inject: false,
        }
    }

    /// Mark this constructor as the injection target.
    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    #[inline]
    pub fn is_injectable(&self) -> bool {
        self.inject
    }

    #[inline]
    pub fn callable(&self) -> &Callable<T> {
        &self.callable
    }
}

/// Types the container can build with [`construct`].
pub trait Constructible: Injectable + Sized {
    /// Every constructor of the type.
    fn constructors() -> Vec<Constructor<Self>>;
}

/// Pick the constructor to inject.
///
/// A lone constructor is used whether or not it is marked. Otherwise
/// exactly one must be marked with [`Constructor::inject`].
pub fn select_constructor<T: Injectable>(
    mut constructors: Vec<Constructor<T>>,
) -> Result<Constructor<T>> {
    if constructors.len() == 1 {
        return Ok(constructors.remove(0));
    }

    let mut marked = constructors.into_iter().filter(Constructor::is_injectable);
    match (marked.next(), marked.next()) {
        (Some(constructor), None) => Ok(constructor),
        (Some(_), Some(_)) => Err(DiError::AmbiguousConstructor {
            type_name: std::any::type_name::<T>(),
        }),
        (None, _) => Err(DiError::NoInjectableConstructor {
            type_name: std::any::type_name::<T>(),
        }),
    }
}

/// Build a `T` with its injectable constructor.
pub fn construct<T, Res>(resolver: &Res) -> Result<T>
where
    T: Constructible,
    Res: Resolver + ?Sized,
{
    let constructor = select_constructor(T::constructors())?;
    invoke(constructor.callable(), resolver, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Database(&'static str);

    #[derive(Debug)]
    struct Logger(&'static str);

    #[derive(Default)]
    struct MapResolver(HashMap<TypeKey, AnyValue>);

    impl MapResolver {
        fn with<T: Injectable>(mut self, value: T) -> Self {
            self.0.insert(TypeKey::of::<T>(), Arc::new(value));
            self
        }
    }

    impl Resolver for MapResolver {
        fn resolve_key(&self, key: &TypeKey) -> Result<AnyValue> {
            self.0.get(key).cloned().ok_or_else(|| DiError::not_found(key))
        }
    }

    struct UserService {
        db: Arc<Database>,
        logger: Arc<Logger>,
    }

    impl Constructible for UserService {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(
                "UserService::new",
                |db: Arc<Database>, logger: Arc<Logger>| UserService { db, logger },
            )]
        }
    }

    #[test]
    fn test_function_parameters_follow_signature() {
        let callable = Callable::function("f", |_: Arc<Database>, _: Arc<Logger>| ());
        assert_eq!(
            callable.parameters(),
            &[TypeKey::of::<Database>(), TypeKey::of::<Logger>()]
        );
    }

    #[test]
    fn test_invoke_function() {
        let resolver = MapResolver::default().with(Database("db")).with(Logger("log"));
        let callable = Callable::function("describe", |db: Arc<Database>, logger: Arc<Logger>| {
            format!("{}+{}", db.0, logger.0)
        });

        assert_eq!(invoke(&callable, &resolver, None).unwrap(), "db+log");
    }

    #[test]
    fn test_invoke_method_with_receiver() {
        struct Greeter {
            greeting: &'static str,
        }

        let resolver = MapResolver::default().with(Logger("world"));
        let callable = Callable::method("Greeter::greet", |greeter: &Greeter, who: Arc<Logger>| {
            format!("{} {}", greeter.greeting, who.0)
        });
        let greeter = Greeter { greeting: "hello" };

        assert_eq!(
            invoke(&callable, &resolver, Some(&greeter)).unwrap(),
            "hello world"
        );
        assert!(matches!(
            invoke(&callable, &resolver, None),
            Err(DiError::MissingReceiver { callable: "Greeter::greet" })
        ));
    }

    #[test]
    fn test_invoke_explicit_callable() {
        let resolver = MapResolver::default().with(7u32);
        let callable: Callable<u32> = Callable::new(
            "double",
            vec![TypeKey::of::<u32>()],
            |_, mut args| Ok(*args.next::<u32>()? * 2),
        );

        assert_eq!(invoke(&callable, &resolver, None).unwrap(), 14);
    }

    #[test]
    fn test_argument_mismatch() {
        let resolver = MapResolver::default().with(7u32);
        let callable: Callable<u64> = Callable::new(
            "wrong",
            vec![TypeKey::of::<u32>()],
            |_, mut args| Ok(*args.next::<u64>()?),
        );

        assert!(matches!(
            invoke(&callable, &resolver, None),
            Err(DiError::ArgumentMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn test_construct_single_constructor() {
        let resolver = MapResolver::default().with(Database("db")).with(Logger("log"));
        let service = construct::<UserService, _>(&resolver).unwrap();

        assert_eq!(service.db.0, "db");
        assert_eq!(service.logger.0, "log");
    }

    #[test]
    fn test_unresolved_dependency_skips_constructor() {
        struct Audited;

        impl Constructible for Audited {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new(
                    "Audited::new",
                    |_: Arc<Logger>, _: Arc<Database>| -> Audited {
                        panic!("constructor must not run")
                    },
                )]
            }
        }

        let resolver = MapResolver::default().with(Logger("log"));
        let err = construct::<Audited, _>(&resolver).err().unwrap();

        match err {
            DiError::UnresolvedDependency {
                callable,
                position,
                key,
            } => {
                assert_eq!(callable, "Audited::new");
                assert_eq!(position, 1);
                assert_eq!(key, TypeKey::of::<Database>());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct TwoWays(&'static str);

    fn unmarked() -> Vec<Constructor<TwoWays>> {
        vec![
            Constructor::new("TwoWays::empty", || TwoWays("empty")),
            Constructor::new("TwoWays::from_db", |db: Arc<Database>| TwoWays(db.0)),
        ]
    }

    #[test]
    fn test_select_requires_marker_when_several() {
        assert!(matches!(
            select_constructor(unmarked()),
            Err(DiError::NoInjectableConstructor { .. })
        ));

        let both: Vec<_> = unmarked().into_iter().map(Constructor::inject).collect();
        assert!(matches!(
            select_constructor(both),
            Err(DiError::AmbiguousConstructor { .. })
        ));

        let mut one = unmarked();
        one[1] = Constructor::new("TwoWays::from_db", |db: Arc<Database>| TwoWays(db.0)).inject();
        let chosen = select_constructor(one).unwrap();
        assert_eq!(chosen.callable().name(), "TwoWays::from_db");
    }

    #[test]
    fn test_select_with_no_constructors() {
        assert!(matches!(
            select_constructor::<TwoWays>(Vec::new()),
            Err(DiError::NoInjectableConstructor { .. })
        ));
    }

    impl Constructible for TwoWays {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new("TwoWays::empty", || TwoWays("empty")),
                Constructor::new("TwoWays::from_db", |db: Arc<Database>| TwoWays(db.0)).inject(),
            ]
        }
    }

    #[test]
    fn test_construct_uses_marked_constructor() {
        let resolver = MapResolver::default().with(Database("marked"));
        assert_eq!(construct::<TwoWays, _>(&resolver).unwrap().0, "marked");
    }

    #[test]
    fn test_container_is_a_resolver() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct Counted {
            db: Arc<Database>,
        }

        impl Constructible for Counted {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new("Counted::new", |db: Arc<Database>| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Counted { db }
                })]
            }
        }

        let container = Container::new();
        let registrar = crate::Registrar::new(&container);
        registrar
            .register(crate::BindingConfig::single(), "t", || Database("container"))
            .unwrap();
        container.freeze();

        let counted = construct::<Counted, _>(&container).unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
        assert_eq!(counted.db.0, "container");
    }
}
