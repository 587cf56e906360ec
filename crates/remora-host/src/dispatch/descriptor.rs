//! Function descriptors supplied by plugin registrations.
//!
//! The core only reads the method name, which doubles as the dispatch key.
//! The remaining fields describe the call contract for the editor side and
//! are carried through untouched.

use std::fmt;

/// Kind of remotely callable functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// A function the editor calls and awaits.
    Function,
    /// A user-facing editor command.
    Command,
    /// A handler bound to an editor autocommand.
    Autocmd,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Function => "function",
            Self::Command => "command",
            Self::Autocmd => "autocmd",
        };
        formatter.write_str(label)
    }
}

/// Whether the editor blocks on the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Synchronous {
    /// The editor waits for the reply.
    #[default]
    Sync,
    /// The editor sends a notification and does not wait.
    Async,
}

/// Whether registration exposes the function through the global map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Callable by the editor.
    #[default]
    Exposed,
    /// Reachable only through the owning plugin's local table.
    Internal,
}

/// Method name plus declared call contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionDescriptor {
    name: String,
    kind: FunctionKind,
    synchronous: Synchronous,
    visibility: Visibility,
}

impl FunctionDescriptor {
    /// Describes functionality of `kind` reachable under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            synchronous: Synchronous::default(),
            visibility: Visibility::default(),
        }
    }

    /// Describes a synchronous, exposed function.
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, FunctionKind::Function)
    }

    /// Describes an editor command.
    #[must_use]
    pub fn command(name: impl Into<String>) -> Self {
        Self::new(name, FunctionKind::Command)
    }

    /// Describes an autocommand handler; autocommands never block the editor.
    #[must_use]
    pub fn autocmd(name: impl Into<String>) -> Self {
        Self::new(name, FunctionKind::Autocmd).asynchronous()
    }

    /// Describes a helper that stays out of the global map.
    #[must_use]
    pub fn internal(name: impl Into<String>) -> Self {
        Self {
            visibility: Visibility::Internal,
            ..Self::function(name)
        }
    }

    /// Marks the call as a notification the editor does not wait on.
    #[must_use]
    pub fn asynchronous(mut self) -> Self {
        self.synchronous = Synchronous::Async;
        self
    }

    /// Dispatch key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Kind of functionality.
    #[must_use]
    pub const fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Declared synchronicity.
    #[must_use]
    pub const fn synchronous(&self) -> Synchronous {
        self.synchronous
    }

    /// Returns `true` when registration should publish the function.
    #[must_use]
    pub const fn is_exposed(&self) -> bool {
        matches!(self.visibility, Visibility::Exposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autocmds_are_asynchronous() {
        let descriptor = FunctionDescriptor::autocmd("BufWritePost");
        assert_eq!(descriptor.kind(), FunctionKind::Autocmd);
        assert_eq!(descriptor.synchronous(), Synchronous::Async);
    }

    #[test]
    fn internal_descriptors_are_hidden() {
        let descriptor = FunctionDescriptor::internal("helper");
        assert!(!descriptor.is_exposed());
        assert_eq!(descriptor.kind(), FunctionKind::Function);
        assert!(FunctionDescriptor::command("Greet").is_exposed());
    }
}
