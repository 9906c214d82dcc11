use std::fmt;

/// Identifies an instrumented method: the module it lives in and its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub module: &'static str,
    pub name: &'static str,
}

impl MethodRef {
    pub const fn new(module: &'static str, name: &'static str) -> Self {
        Self { module, name }
    }

    /// Counter key: module path immediately followed by the method name.
    pub fn key(&self) -> String {
        format!("{}{}", self.module, self.name)
    }
}

/// Builds a [`MethodRef`] for `name` in the calling module.
#[macro_export]
macro_rules! method_ref {
    ($name:expr) => {
        $crate::usage::MethodRef::new(module_path!(), $name)
    };
}

/// The arguments of an instrumented call, rendered with `Debug` for the usage record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArguments {
    positional: Vec<String>,
    named: Vec<(String, String)>,
}

impl CallArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl fmt::Debug) -> Self {
        self.positional.push(format!("{:?}", value));
        self
    }

    pub fn kwarg(mut self, name: &str, value: impl fmt::Debug) -> Self {
        self.named.push((name.to_string(), format!("{:?}", value)));
        self
    }
}

impl fmt::Display for CallArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named: Vec<String> = self
            .named
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect();
        write!(
            f,
            "args: ({}); kwargs: {{{}}}",
            self.positional.join(", "),
            named.join(", ")
        )
    }
}
