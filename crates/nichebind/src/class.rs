//! Class-style dispatch over wrapped exports.
//!
//! A class is a family of exports sharing a prefix: `<prefix>alloc` creates
//! an object and returns its handle, `<prefix>dealloc` frees it, and every
//! other `<prefix><method>` takes the handle as its first argument.

use std::collections::HashMap;

use crate::args::Arg;
use crate::bindings::Bindings;
use crate::error::{BridgeError, Result};
use crate::value::Value;

const ALLOC: &str = "alloc";
const DEALLOC: &str = "dealloc";

/// Post-processing applied to one method's decoded result.
pub type MethodTransform = Box<dyn Fn(Value) -> Value>;

/// Options for [`ClassAdapter::new`].
#[derive(Default)]
pub struct ClassOptions {
    /// Methods to expose.  Inferred from the prefix when `None`.
    pub methods: Option<Vec<String>>,
    pub transforms: HashMap<String, MethodTransform>,
}

impl ClassOptions {
    pub fn with_methods<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: Some(methods.into_iter().map(Into::into).collect()),
            transforms: HashMap::new(),
        }
    }

    pub fn transform(
        mut self,
        method: impl Into<String>,
        f: impl Fn(Value) -> Value + 'static,
    ) -> Self {
        self.transforms.insert(method.into(), Box::new(f));
        self
    }
}

/// An object created through a [`ClassAdapter`]: an opaque handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Object {
    ptr: Arg,
}

impl Object {
    pub fn ptr(&self) -> Arg {
        self.ptr
    }
}

/// Constructor and method table for one export prefix.
pub struct ClassAdapter {
    prefix: String,
    methods: Vec<String>,
    transforms: HashMap<String, MethodTransform>,
}

impl ClassAdapter {
    /// Resolve the class's exports.
    ///
    /// Inferred methods are every wrapped export starting with the prefix.
    /// That over-matches when another class's prefix extends this one
    /// (`foo_` also picks up `foo_bar_len`); pass explicit methods then.
    pub fn new<T>(bindings: &Bindings<T>, prefix: &str, options: ClassOptions) -> Result<Self> {
        let prefix = if prefix.ends_with('_') {
            prefix.to_string()
        } else {
            format!("{prefix}_")
        };

        let alloc = format!("{prefix}{ALLOC}");
        if !bindings.contains(&alloc) {
            return Err(BridgeError::MissingConstructor(alloc));
        }
        let dealloc = format!("{prefix}{DEALLOC}");
        if !bindings.contains(&dealloc) {
            return Err(BridgeError::MissingDestructor(dealloc));
        }

        let mut methods = match options.methods {
            Some(methods) => methods,
            None => bindings
                .names()
                .filter(|name| *name != alloc)
                .filter_map(|name| name.strip_prefix(prefix.as_str()))
                .map(str::to_string)
                .collect(),
        };
        if !methods.iter().any(|m| m == DEALLOC) {
            methods.push(DEALLOC.to_string());
        }
        if let Some(missing) = methods
            .iter()
            .map(|m| format!("{prefix}{m}"))
            .find(|export| !bindings.contains(export))
        {
            return Err(BridgeError::UndefinedMethod(missing));
        }

        Ok(Self {
            prefix,
            methods,
            transforms: options.transforms,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Call `<prefix>alloc` and keep the returned handle.
    pub fn construct<T>(&self, bindings: &mut Bindings<T>, args: &[Arg]) -> Result<Object> {
        let alloc = format!("{}{ALLOC}", self.prefix);
        let ptr = match bindings.call(&alloc, args)? {
            Value::Number(x) => Arg::Number(x),
            Value::BigInt(x) => Arg::BigInt(x),
            Value::BigUint(x) => Arg::BigInt(x as i64),
            _ => return Err(BridgeError::InvalidHandle(alloc)),
        };
        Ok(Object { ptr })
    }

    /// Call a method with the object's handle prepended to `args`.
    pub fn call<T>(
        &self,
        bindings: &mut Bindings<T>,
        object: &Object,
        method: &str,
        args: &[Arg],
    ) -> Result<Value> {
        if !self.has_method(method) {
            return Err(BridgeError::UndefinedMethod(format!("{}{method}", self.prefix)));
        }
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(object.ptr);
        full.extend_from_slice(args);
        let value = bindings.call(&format!("{}{method}", self.prefix), &full)?;
        Ok(match self.transforms.get(method) {
            Some(transform) => transform(value),
            None => value,
        })
    }

    /// Free the object through `<prefix>dealloc`.
    pub fn dealloc<T>(&self, bindings: &mut Bindings<T>, object: Object) -> Result<Value> {
        self.call(bindings, &object, DEALLOC, &[])
    }
}
