//! Handler lifecycle, argument binding and action methods.
//!
//! These are the collaborator seams the invoker consumes:
//!
//! - [`HandlerFactory`] creates and releases the handler instance
//! - [`ArgumentBinder`] resolves named arguments for the action
//! - [`ActionMethod`] is the action itself, called with positional arguments
//!
//! Concrete model binding, dependency injection and routing live outside
//! this crate; the adapters here cover closures and `Default` types.

use crate::context::ActionContext;
use crate::descriptor::ParameterDescriptor;
use crate::result::{ActionReturn, ReturnKind};
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased handler instance.
pub type HandlerInstance = Box<dyn Any + Send + Sync>;

/// Named arguments resolved by an [`ArgumentBinder`], in binding order.
pub type Arguments = IndexMap<String, Value>;

/// Creates and releases handler instances.
///
/// The invoker calls [`create`](HandlerFactory::create) at most once per
/// invocation and, whenever it did, calls [`release`](HandlerFactory::release)
/// exactly once with that instance before returning.
pub trait HandlerFactory: Send + Sync {
    /// Creates the handler for this request.
    fn create(&self, context: &ActionContext) -> anyhow::Result<HandlerInstance>;

    /// Releases a handler created by [`create`](HandlerFactory::create).
    fn release(&self, context: &ActionContext, handler: HandlerInstance) {
        let _ = context;
        drop(handler);
    }
}

/// A handler factory backed by closures.
///
/// # Example
///
/// ```
/// use strata_core::{ActionContext, FnHandlerFactory, HandlerFactory, fixtures};
///
/// let factory = FnHandlerFactory::new(|_ctx| Ok(Box::new(String::from("orders"))));
/// let ctx = ActionContext::new(fixtures::unit_action("list"));
///
/// let handler = factory.create(&ctx).unwrap();
/// assert_eq!(handler.downcast_ref::<String>().unwrap(), "orders");
/// factory.release(&ctx, handler);
/// ```
pub struct FnHandlerFactory<C> {
    create: C,
    release: Option<Box<dyn Fn(&ActionContext, HandlerInstance) + Send + Sync>>,
}

impl<C> FnHandlerFactory<C>
where
    C: Fn(&ActionContext) -> anyhow::Result<HandlerInstance> + Send + Sync,
{
    /// Creates a factory from a create function. Released handlers are dropped.
    #[must_use]
    pub fn new(create: C) -> Self {
        Self {
            create,
            release: None,
        }
    }

    /// Sets a function that receives released handlers.
    #[must_use]
    pub fn on_release<R>(mut self, release: R) -> Self
    where
        R: Fn(&ActionContext, HandlerInstance) + Send + Sync + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }
}

impl<C> HandlerFactory for FnHandlerFactory<C>
where
    C: Fn(&ActionContext) -> anyhow::Result<HandlerInstance> + Send + Sync,
{
    fn create(&self, context: &ActionContext) -> anyhow::Result<HandlerInstance> {
        (self.create)(context)
    }

    fn release(&self, context: &ActionContext, handler: HandlerInstance) {
        match &self.release {
            Some(release) => release(context, handler),
            None => drop(handler),
        }
    }
}

/// Activates handlers of type `T` through [`Default`].
pub struct TypeActivatorFactory<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypeActivatorFactory<T> {
    /// Creates the factory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypeActivatorFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandlerFactory for TypeActivatorFactory<T>
where
    T: Default + Send + Sync + 'static,
{
    fn create(&self, _context: &ActionContext) -> anyhow::Result<HandlerInstance> {
        Ok(Box::new(T::default()))
    }
}

/// Resolves the named arguments of an action.
///
/// Per-parameter problems should be recorded in the context's
/// [`ModelState`](crate::ModelState) rather than returned as an error; an
/// `Err` is treated as a fault of the action stage.
pub trait ArgumentBinder: Send + Sync {
    /// Binds arguments for the handler about to be invoked.
    fn bind<'a>(
        &'a self,
        context: &'a mut ActionContext,
        handler: &'a (dyn Any + Send + Sync),
    ) -> BoxFuture<'a, anyhow::Result<Arguments>>;
}

/// Binds nothing. Every parameter falls back to its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoArgumentBinder;

impl ArgumentBinder for NoArgumentBinder {
    fn bind<'a>(
        &'a self,
        _context: &'a mut ActionContext,
        _handler: &'a (dyn Any + Send + Sync),
    ) -> BoxFuture<'a, anyhow::Result<Arguments>> {
        Box::pin(async { Ok(Arguments::new()) })
    }
}

/// Binds arguments with a synchronous closure over the request context.
///
/// # Example
///
/// ```
/// use strata_core::{Arguments, FnArgumentBinder};
///
/// let binder = FnArgumentBinder::new(|ctx| {
///     let mut args = Arguments::new();
///     if let Some(tenant) = ctx.header("x-tenant") {
///         args.insert("tenant".into(), tenant.into());
///     } else {
///         ctx.model_state_mut().add_error("tenant", "missing x-tenant header");
///     }
///     Ok(args)
/// });
/// # let _ = binder;
/// ```
pub struct FnArgumentBinder<F> {
    func: F,
}

impl<F> FnArgumentBinder<F>
where
    F: Fn(&mut ActionContext) -> anyhow::Result<Arguments> + Send + Sync,
{
    /// Creates the binder.
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> ArgumentBinder for FnArgumentBinder<F>
where
    F: Fn(&mut ActionContext) -> anyhow::Result<Arguments> + Send + Sync,
{
    fn bind<'a>(
        &'a self,
        context: &'a mut ActionContext,
        _handler: &'a (dyn Any + Send + Sync),
    ) -> BoxFuture<'a, anyhow::Result<Arguments>> {
        Box::pin(async move { (self.func)(context) })
    }
}

/// The method that implements an action.
pub trait ActionMethod: Send + Sync {
    /// Declared return shape, used to normalize the returned value.
    fn return_kind(&self) -> ReturnKind;

    /// Invokes the action on `handler` with positional arguments.
    fn call<'a>(
        &'a self,
        handler: &'a mut (dyn Any + Send + Sync),
        arguments: Vec<Value>,
    ) -> BoxFuture<'a, anyhow::Result<ActionReturn>>;
}

/// An action method that ignores the handler instance.
pub struct FnActionMethod<F> {
    return_kind: ReturnKind,
    func: F,
}

impl<F, Fut> FnActionMethod<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ActionReturn>> + Send + 'static,
{
    /// Creates an action method with the given declared return shape.
    #[must_use]
    pub const fn new(return_kind: ReturnKind, func: F) -> Self {
        Self { return_kind, func }
    }
}

impl<F, Fut> ActionMethod for FnActionMethod<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ActionReturn>> + Send + 'static,
{
    fn return_kind(&self) -> ReturnKind {
        self.return_kind.clone()
    }

    fn call<'a>(
        &'a self,
        _handler: &'a mut (dyn Any + Send + Sync),
        arguments: Vec<Value>,
    ) -> BoxFuture<'a, anyhow::Result<ActionReturn>> {
        Box::pin((self.func)(arguments))
    }
}

/// An action method on a concrete handler type `T`.
///
/// Fails if the handler instance is not a `T`.
///
/// # Example
///
/// ```
/// use strata_core::{ActionReturn, ReturnKind, TypedActionMethod};
///
/// #[derive(Default)]
/// struct Counter {
///     hits: u64,
/// }
///
/// let method = TypedActionMethod::new(ReturnKind::value("u64"), |c: &mut Counter, _args| {
///     c.hits += 1;
///     Ok(ActionReturn::Value(c.hits.into()))
/// });
/// # let _ = method;
/// ```
pub struct TypedActionMethod<T, F> {
    return_kind: ReturnKind,
    func: F,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T, F> TypedActionMethod<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&mut T, Vec<Value>) -> anyhow::Result<ActionReturn> + Send + Sync,
{
    /// Creates the method.
    #[must_use]
    pub const fn new(return_kind: ReturnKind, func: F) -> Self {
        Self {
            return_kind,
            func,
            _marker: PhantomData,
        }
    }
}

impl<T, F> ActionMethod for TypedActionMethod<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&mut T, Vec<Value>) -> anyhow::Result<ActionReturn> + Send + Sync,
{
    fn return_kind(&self) -> ReturnKind {
        self.return_kind.clone()
    }

    fn call<'a>(
        &'a self,
        handler: &'a mut (dyn Any + Send + Sync),
        arguments: Vec<Value>,
    ) -> BoxFuture<'a, anyhow::Result<ActionReturn>> {
        Box::pin(async move {
            let instance = handler.downcast_mut::<T>().ok_or_else(|| {
                anyhow::anyhow!(
                    "handler instance is not a {}",
                    std::any::type_name::<T>()
                )
            })?;
            (self.func)(instance, arguments)
        })
    }
}

/// The method used by descriptors built without one.
pub(crate) struct NoopActionMethod;

impl ActionMethod for NoopActionMethod {
    fn return_kind(&self) -> ReturnKind {
        ReturnKind::Unit
    }

    fn call<'a>(
        &'a self,
        _handler: &'a mut (dyn Any + Send + Sync),
        _arguments: Vec<Value>,
    ) -> BoxFuture<'a, anyhow::Result<ActionReturn>> {
        Box::pin(async { Ok(ActionReturn::Unit) })
    }
}

/// Orders bound arguments by the declared parameters.
///
/// Missing arguments take the parameter's default, or `null`. Arguments that
/// match no parameter are ignored.
///
/// # Example
///
/// ```
/// use strata_core::{prepare_arguments, Arguments, ParameterDescriptor};
/// use serde_json::json;
///
/// let params = [
///     ParameterDescriptor::new("id"),
///     ParameterDescriptor::new("page").with_default(json!(1)),
///     ParameterDescriptor::new("filter"),
/// ];
/// let mut args = Arguments::new();
/// args.insert("id".into(), json!(7));
///
/// assert_eq!(prepare_arguments(&params, &args), vec![json!(7), json!(1), json!(null)]);
/// ```
#[must_use]
pub fn prepare_arguments(parameters: &[ParameterDescriptor], arguments: &Arguments) -> Vec<Value> {
    parameters
        .iter()
        .map(|parameter| {
            arguments
                .get(parameter.name())
                .or_else(|| parameter.default_value())
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect()
}
