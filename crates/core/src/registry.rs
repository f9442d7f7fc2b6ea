//! Registry of native methods callable from the hosted runtime.
//!
//! Bound methods are stored type-erased behind [`BoundMethod`]. The typed
//! helpers ([`MethodRegistry::bind`], [`MethodRegistry::bind_async`]) build the
//! erased wrapper once, at bind time, from an ordinary closure: each wrapper
//! knows how to pull its N arguments out of a JSON array and call the closure.
//!
//! Argument decoding is lenient by position. A value that does not
//! deserialize into the declared parameter type, or a missing value, is
//! replaced with `Default::default()` instead of failing the call.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use xwv_runtime::{Error, Result};

/// Identity of a bound method: `window[object][function]` on the script side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey {
	pub object: String,
	pub function: String,
}

impl BindingKey {
	/// Creates a key. Surrounding whitespace in the object name is ignored.
	pub fn new(object: impl AsRef<str>, function: impl Into<String>) -> Self {
		Self {
			object: object.as_ref().trim().to_string(),
			function: function.into(),
		}
	}

	fn validate(&self) -> Result<()> {
		if self.object.is_empty() {
			return Err(Error::InvalidArgument("object name must not be empty".into()));
		}
		if self.function.is_empty() {
			return Err(Error::InvalidArgument(format!("function name for '{}' must not be empty", self.object)));
		}
		Ok(())
	}
}

impl fmt::Display for BindingKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.object, self.function)
	}
}

/// Outcome of invoking a bound method.
pub enum Invocation {
	/// The method returned synchronously.
	Ready(Value),
	/// The method returned a future that settles later.
	Deferred(BoxFuture<'static, Result<Value>>),
}

impl fmt::Debug for Invocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Invocation::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
			Invocation::Deferred(_) => f.write_str("Deferred(..)"),
		}
	}
}

/// A native callable that decodes its own arguments.
///
/// Implement this directly for methods whose arity or argument handling the
/// closure helpers cannot express, then register with
/// [`MethodRegistry::bind_method`].
pub trait BoundMethod: Send + Sync {
	/// Names of the declared parameter types, in order.
	fn param_types(&self) -> Vec<&'static str>;

	/// Decodes `args` and invokes the method.
	fn invoke(&self, args: &[Value]) -> Result<Invocation>;
}

/// Decodes argument `index`, falling back to the type's default.
pub(crate) fn coerce_arg<T>(args: &[Value], index: usize) -> T
where
	T: DeserializeOwned + Default,
{
	let Some(value) = args.get(index) else {
		tracing::debug!(index, "Missing argument, substituting default");
		return T::default();
	};
	match serde_json::from_value::<T>(value.clone()) {
		Ok(decoded) => decoded,
		Err(err) => {
			tracing::warn!(
				index,
				expected = std::any::type_name::<T>(),
				error = %err,
				"Argument did not match parameter type, substituting default"
			);
			T::default()
		}
	}
}

/// Synchronous closure callable with arguments decoded from JSON.
///
/// Implemented for `Fn(A1, .., An) -> R` with up to six arguments, where
/// every `Ai: DeserializeOwned + Default` and `R: Serialize`.
pub trait SyncHandler<Args>: Send + Sync + 'static {
	fn param_types() -> Vec<&'static str>;

	fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Asynchronous closure callable with arguments decoded from JSON.
///
/// Implemented for `Fn(A1, .., An) -> Fut` with up to six arguments, where
/// `Fut: Future<Output = Result<R, E>>`, `R: Serialize` and `E: Display`.
pub trait AsyncHandler<Args>: Send + Sync + 'static {
	fn param_types() -> Vec<&'static str>;

	fn call(&self, args: &[Value]) -> BoxFuture<'static, Result<Value>>;
}

macro_rules! impl_handlers {
	($($idx:tt $ty:ident),*) => {
		impl<F, R, $($ty,)*> SyncHandler<($($ty,)*)> for F
		where
			F: Fn($($ty),*) -> R + Send + Sync + 'static,
			R: Serialize,
			$($ty: DeserializeOwned + Default,)*
		{
			fn param_types() -> Vec<&'static str> {
				vec![$(std::any::type_name::<$ty>()),*]
			}

			#[allow(unused_variables)]
			fn call(&self, args: &[Value]) -> Result<Value> {
				let output = (self)($(coerce_arg::<$ty>(args, $idx)),*);
				Ok(serde_json::to_value(output)?)
			}
		}

		impl<F, Fut, R, E, $($ty,)*> AsyncHandler<($($ty,)*)> for F
		where
			F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
			Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
			R: Serialize,
			E: fmt::Display,
			$($ty: DeserializeOwned + Default,)*
		{
			fn param_types() -> Vec<&'static str> {
				vec![$(std::any::type_name::<$ty>()),*]
			}

			#[allow(unused_variables)]
			fn call(&self, args: &[Value]) -> BoxFuture<'static, Result<Value>> {
				let fut = (self)($(coerce_arg::<$ty>(args, $idx)),*);
				Box::pin(async move {
					let output = fut.await.map_err(|err| Error::Invocation(err.to_string()))?;
					Ok(serde_json::to_value(output)?)
				})
			}
		}
	};
}

impl_handlers!();
impl_handlers!(0 A1);
impl_handlers!(0 A1, 1 A2);
impl_handlers!(0 A1, 1 A2, 2 A3);
impl_handlers!(0 A1, 1 A2, 2 A3, 3 A4);
impl_handlers!(0 A1, 1 A2, 2 A3, 3 A4, 4 A5);
impl_handlers!(0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6);

struct SyncMethod<H, Args> {
	handler: H,
	_args: PhantomData<fn() -> Args>,
}

impl<H, Args> BoundMethod for SyncMethod<H, Args>
where
	H: SyncHandler<Args>,
	Args: 'static,
{
	fn param_types(&self) -> Vec<&'static str> {
		H::param_types()
	}

	fn invoke(&self, args: &[Value]) -> Result<Invocation> {
		self.handler.call(args).map(Invocation::Ready)
	}
}

struct AsyncMethod<H, Args> {
	handler: H,
	_args: PhantomData<fn() -> Args>,
}

impl<H, Args> BoundMethod for AsyncMethod<H, Args>
where
	H: AsyncHandler<Args>,
	Args: 'static,
{
	fn param_types(&self) -> Vec<&'static str> {
		H::param_types()
	}

	fn invoke(&self, args: &[Value]) -> Result<Invocation> {
		Ok(Invocation::Deferred(self.handler.call(args)))
	}
}

/// A registered method together with its identity and parameter list.
#[derive(Clone)]
pub struct BoundMethodDescriptor {
	key: BindingKey,
	param_types: Vec<&'static str>,
	method: Arc<dyn BoundMethod>,
}

impl BoundMethodDescriptor {
	pub fn key(&self) -> &BindingKey {
		&self.key
	}

	pub fn param_types(&self) -> &[&'static str] {
		&self.param_types
	}

	pub fn invoke(&self, args: &[Value]) -> Result<Invocation> {
		self.method.invoke(args)
	}
}

impl fmt::Debug for BoundMethodDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BoundMethodDescriptor")
			.field("key", &self.key)
			.field("param_types", &self.param_types)
			.finish()
	}
}

/// Concurrent map from [`BindingKey`] to bound method.
///
/// Every mutation bumps [`generation`](Self::generation), which the script
/// synthesizer uses to decide whether its cached script is stale.
#[derive(Default)]
pub struct MethodRegistry {
	methods: DashMap<BindingKey, BoundMethodDescriptor>,
	generation: AtomicU64,
}

impl MethodRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a synchronous closure as `object.function`, replacing any
	/// previous binding with the same identity.
	pub fn bind<H, Args>(&self, object: &str, function: &str, handler: H) -> Result<()>
	where
		H: SyncHandler<Args>,
		Args: 'static,
	{
		self.bind_method(
			BindingKey::new(object, function),
			Arc::new(SyncMethod {
				handler,
				_args: PhantomData,
			}),
		)
	}

	/// Registers an asynchronous closure as `object.function`.
	///
	/// The script-side promise settles when the returned future does; an
	/// `Err` rejects it with the error's display text.
	pub fn bind_async<H, Args>(&self, object: &str, function: &str, handler: H) -> Result<()>
	where
		H: AsyncHandler<Args>,
		Args: 'static,
	{
		self.bind_method(
			BindingKey::new(object, function),
			Arc::new(AsyncMethod {
				handler,
				_args: PhantomData,
			}),
		)
	}

	/// Registers a custom [`BoundMethod`].
	pub fn bind_method(&self, key: BindingKey, method: Arc<dyn BoundMethod>) -> Result<()> {
		key.validate()?;
		let descriptor = BoundMethodDescriptor {
			key: key.clone(),
			param_types: method.param_types(),
			method,
		};
		let replaced = self.methods.insert(key.clone(), descriptor).is_some();
		self.bump();
		tracing::debug!(%key, replaced, "Bound native method");
		Ok(())
	}

	/// Removes a binding. Returns `false` if nothing was bound under `key`.
	pub fn unbind(&self, key: &BindingKey) -> bool {
		let removed = self.methods.remove(key).is_some();
		if removed {
			self.bump();
			tracing::debug!(%key, "Unbound native method");
		}
		removed
	}

	/// Removes every binding.
	pub fn unbind_all(&self) {
		self.methods.clear();
		self.bump();
	}

	/// Looks up the method bound as `key`.
	pub fn resolve(&self, key: &BindingKey) -> Result<BoundMethodDescriptor> {
		self.methods
			.get(key)
			.map(|entry| entry.value().clone())
			.ok_or_else(|| Error::UnknownBinding {
				object: key.object.clone(),
				function: key.function.clone(),
			})
	}

	/// Returns every bound identity in sorted order.
	pub fn keys(&self) -> Vec<BindingKey> {
		let mut keys: Vec<BindingKey> = self.methods.iter().map(|entry| entry.key().clone()).collect();
		keys.sort();
		keys
	}

	pub fn len(&self) -> usize {
		self.methods.len()
	}

	pub fn is_empty(&self) -> bool {
		self.methods.is_empty()
	}

	/// Counter incremented on every mutation.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	fn bump(&self) {
		self.generation.fetch_add(1, Ordering::AcqRel);
	}
}

impl fmt::Debug for MethodRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodRegistry")
			.field("methods", &self.keys())
			.field("generation", &self.generation())
			.finish()
	}
}
