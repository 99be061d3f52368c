//! Binding of declared contract interfaces to parsed ABIs.
//!
//! An interface is a type implementing [`ContractInterface`]: a list of method
//! declarations with host-level parameter and return shapes. Binding checks every
//! declaration against the ABI once and produces an [`AbiBinding`], a dispatch table
//! from method name to ABI function and route. Tables are cached per
//! `(interface, ABI)` pair for the lifetime of the process.

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use alloy::primitives::B256;

use crate::abi::{Abi, FunctionMetadata};
use crate::error::BindingError;
use crate::schema::TypeSchema;

/// Host-side shape of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostType {
    /// Any `uintN` or `intN`.
    Integer,
    Address,
    Bool,
    /// `string`.
    Text,
    /// `bytes` or `bytesN`.
    Bytes,
    /// `T[]` or `T[N]`.
    List(Box<HostType>),
    /// A tuple with exactly these components.
    Record(Vec<HostType>),
    /// Accepts every ABI type.
    Any,
}

impl HostType {
    pub fn list(element: HostType) -> Self {
        Self::List(Box::new(element))
    }

    /// Whether values of `schema` can be passed as or read into this shape.
    pub fn accepts(&self, schema: &TypeSchema) -> bool {
        match (self, schema) {
            (Self::Any, _) => true,
            (Self::Integer, TypeSchema::Uint(_) | TypeSchema::Int(_)) => true,
            (Self::Address, TypeSchema::Address) => true,
            (Self::Bool, TypeSchema::Bool) => true,
            (Self::Text, TypeSchema::String) => true,
            (Self::Bytes, TypeSchema::Bytes | TypeSchema::FixedBytes(_)) => true,
            (Self::List(element), TypeSchema::Array(inner) | TypeSchema::FixedArray(inner, _)) => {
                element.accepts(inner)
            }
            (Self::Record(fields), TypeSchema::Tuple(components)) => {
                fields.len() == components.len()
                    && fields.iter().zip(components).all(|(f, c)| f.accepts(c))
            }
            _ => false,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::Text => f.write_str("text"),
            Self::Bytes => f.write_str("bytes"),
            Self::List(element) => write!(f, "list of {element}"),
            Self::Record(fields) => {
                f.write_str("record(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str(")")
            }
            Self::Any => f.write_str("any"),
        }
    }
}

/// What a method hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Returns {
    /// Nothing.
    #[default]
    Unit,
    /// The transaction receipt; only for state-changing methods.
    Receipt,
    /// One value: a single output, or all outputs as a [`HostType::Record`].
    Value(HostType),
    /// One value per output.
    Values(Vec<HostType>),
    /// The decoded outputs, unchecked.
    Raw,
}

/// Declaration of one interface method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    name: &'static str,
    params: Vec<HostType>,
    returns: Returns,
    value_bearing: bool,
}

impl MethodDecl {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            returns: Returns::Unit,
            value_bearing: false,
        }
    }

    pub fn param(mut self, ty: HostType) -> Self {
        self.params.push(ty);
        self
    }

    pub fn returns(mut self, returns: Returns) -> Self {
        self.returns = returns;
        self
    }

    /// Marks the method as attaching value: its first parameter is the amount in wei
    /// and is not passed to the contract function.
    pub fn value_bearing(mut self) -> Self {
        self.value_bearing = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared parameters, including the leading amount of a value-bearing method.
    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    pub fn return_shape(&self) -> &Returns {
        &self.returns
    }

    pub fn is_value_bearing(&self) -> bool {
        self.value_bearing
    }
}

/// A contract interface: the set of methods a caller wants to invoke.
///
/// ```
/// use eth_contract_sdk::binding::{ContractInterface, HostType, MethodDecl, Returns};
///
/// struct Token;
///
/// impl ContractInterface for Token {
///     fn methods() -> Vec<MethodDecl> {
///         vec![
///             MethodDecl::new("balanceOf")
///                 .param(HostType::Address)
///                 .returns(Returns::Value(HostType::Integer)),
///             MethodDecl::new("transfer")
///                 .param(HostType::Address)
///                 .param(HostType::Integer)
///                 .returns(Returns::Receipt),
///         ]
///     }
/// }
/// ```
pub trait ContractInterface: Send + Sync + 'static {
    fn methods() -> Vec<MethodDecl>;

    fn interface_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// How a bound method is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `view`/`pure`: a read-only call.
    View,
    /// Everything else: a submitted transaction.
    Write,
}

/// A declaration paired with the ABI function it resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    decl: MethodDecl,
    function: Arc<FunctionMetadata>,
    route: Route,
}

impl ResolvedMethod {
    pub fn decl(&self) -> &MethodDecl {
        &self.decl
    }

    pub fn function(&self) -> &Arc<FunctionMetadata> {
        &self.function
    }

    pub fn route(&self) -> Route {
        self.route
    }
}

/// The dispatch table of one interface over one ABI.
#[derive(Debug)]
pub struct AbiBinding {
    abi: Arc<Abi>,
    interface: &'static str,
    methods: HashMap<&'static str, ResolvedMethod>,
}

type CacheKey = (TypeId, B256);

static BINDINGS: LazyLock<RwLock<HashMap<CacheKey, Arc<AbiBinding>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

impl AbiBinding {
    /// Resolves every method of `I` against `abi`. Fails on the first incompatible method.
    pub fn resolve<I: ContractInterface>(abi: Arc<Abi>) -> Result<Self, BindingError> {
        let interface = I::interface_name();
        let decls = I::methods();
        if decls.is_empty() {
            return Err(BindingError::NotAnInterface(interface.to_string()));
        }

        let mut methods = HashMap::with_capacity(decls.len());
        for decl in decls {
            let resolved = resolve_method(&abi, decl)?;
            match methods.entry(resolved.decl.name) {
                Entry::Occupied(_) => {
                    return Err(BindingError::DuplicateMethod {
                        interface: interface.to_string(),
                        method: resolved.decl.name.to_string(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(resolved);
                }
            }
        }

        log::debug!("Bound {} methods of {interface}", methods.len());
        Ok(Self {
            abi,
            interface,
            methods,
        })
    }

    /// Like [`AbiBinding::resolve`], but reuses the table built earlier for the same
    /// interface and ABI document.
    pub fn resolve_cached<I: ContractInterface>(abi: Arc<Abi>) -> Result<Arc<Self>, BindingError> {
        let key = (TypeId::of::<I>(), abi.fingerprint());
        // Entries are immutable once inserted, so a poisoned lock still guards valid data.
        if let Some(binding) = BINDINGS
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            log::trace!("Binding cache hit for {}", I::interface_name());
            return Ok(binding.clone());
        }

        let binding = Arc::new(Self::resolve::<I>(abi)?);
        let mut cache = BINDINGS.write().unwrap_or_else(PoisonError::into_inner);
        // A concurrent resolver may have won the race; keep its table.
        Ok(cache.entry(key).or_insert(binding).clone())
    }

    pub fn abi(&self) -> &Arc<Abi> {
        &self.abi
    }

    pub fn interface(&self) -> &'static str {
        self.interface
    }

    pub fn method(&self, name: &str) -> Option<&ResolvedMethod> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &ResolvedMethod> {
        self.methods.values()
    }
}

fn resolve_method(abi: &Abi, decl: MethodDecl) -> Result<ResolvedMethod, BindingError> {
    let function = abi
        .function(decl.name)
        .ok_or_else(|| BindingError::NoAbiCounterpart(decl.name.to_string()))?
        .clone();
    let method = decl.name.to_string();

    let params = if decl.value_bearing {
        match decl.params.split_first() {
            Some((HostType::Integer, rest)) => {
                if !function.is_payable() {
                    return Err(BindingError::NotPayable(method));
                }
                rest
            }
            _ => return Err(BindingError::MissingValueParameter(method)),
        }
    } else {
        &decl.params[..]
    };

    if params.len() != function.inputs().len() {
        return Err(BindingError::ParameterCount {
            method,
            declared: params.len(),
            expected: function.inputs().len(),
        });
    }
    for (index, (declared, input)) in params.iter().zip(function.inputs()).enumerate() {
        if !declared.accepts(&input.schema) {
            return Err(BindingError::ParameterType {
                method,
                index,
                declared: declared.to_string(),
                abi_type: input.schema.canonical(),
            });
        }
    }

    let route = if function.is_view() {
        Route::View
    } else {
        Route::Write
    };
    check_returns(&decl, &function, route)?;

    Ok(ResolvedMethod {
        decl,
        function,
        route,
    })
}

fn check_returns(
    decl: &MethodDecl,
    function: &FunctionMetadata,
    route: Route,
) -> Result<(), BindingError> {
    let fail = |reason: String| {
        Err(BindingError::ReturnType {
            method: decl.name.to_string(),
            reason,
        })
    };
    let outputs = function.outputs();

    match (route, &decl.returns) {
        (Route::Write, Returns::Unit | Returns::Receipt) => Ok(()),
        (Route::Write, other) => fail(format!(
            "state-changing function returns a receipt, not {other:?}"
        )),
        (Route::View, Returns::Receipt) => fail("view function produces no receipt".into()),
        (Route::View, Returns::Raw) => Ok(()),
        (Route::View, Returns::Unit) if outputs.is_empty() => Ok(()),
        (Route::View, Returns::Unit) => fail(format!(
            "function returns ({}), declared nothing",
            function.output_types().join(",")
        )),
        (Route::View, Returns::Value(shape)) => {
            let fits = match outputs {
                [single] => shape.accepts(&single.schema),
                [] => false,
                many => shape.accepts(&TypeSchema::Tuple(
                    many.iter().map(|p| p.schema.clone()).collect(),
                )),
            };
            if fits {
                Ok(())
            } else {
                fail(format!(
                    "{shape} cannot hold ({})",
                    function.output_types().join(",")
                ))
            }
        }
        (Route::View, Returns::Values(shapes)) => {
            if shapes.len() == outputs.len()
                && shapes.iter().zip(outputs).all(|(s, o)| s.accepts(&o.schema))
            {
                Ok(())
            } else {
                fail(format!(
                    "{} declared values cannot hold ({})",
                    shapes.len(),
                    function.output_types().join(",")
                ))
            }
        }
    }
}
