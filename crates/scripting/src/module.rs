//! Script modules: the hook contract and its Rhai implementation.

use crate::{ScriptError, ScriptSandbox};
use rhai::{CallFnOptions, Dynamic, Engine, FuncArgs, Map, Scope, AST};
use std::rc::Rc;

/// Persistent per-binding state, exposed to Rhai hooks as `this`.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    pub this: Dynamic,
}

impl Default for ScriptContext {
    fn default() -> Self {
        Self {
            this: Dynamic::from_map(Map::new()),
        }
    }
}

impl ScriptContext {
    pub fn get(&self, key: &str) -> Option<Dynamic> {
        self.this.read_lock::<Map>()?.get(key).cloned()
    }

    /// Store a value. Does nothing if a script replaced `this` with a non-map value.
    pub fn set(&mut self, key: &str, value: Dynamic) {
        if let Some(mut map) = self.this.write_lock::<Map>() {
            map.insert(key.into(), value);
        }
    }
}

/// A unit of scripted behavior bound to one `Script` component slot.
///
/// All hooks are optional.
pub trait ScriptModule {
    fn init(&mut self, _obj: &ScriptSandbox, _ctx: &mut ScriptContext) -> Result<(), ScriptError> {
        Ok(())
    }

    fn update(&mut self, _obj: &ScriptSandbox, _ctx: &mut ScriptContext, _dt: f32) -> Result<(), ScriptError> {
        Ok(())
    }

    fn cleanup(&mut self, _obj: &ScriptSandbox, _ctx: &mut ScriptContext) -> Result<(), ScriptError> {
        Ok(())
    }
}

/// Rhai source compiled once and shared by every binding of the same file.
pub struct RhaiModule {
    engine: Rc<Engine>,
    ast: Rc<AST>,
    file: String,
    scope: Scope<'static>,
    has_init: bool,
    has_update: bool,
    has_cleanup: bool,
}

impl RhaiModule {
    pub fn new(engine: Rc<Engine>, ast: Rc<AST>, file: impl Into<String>) -> Self {
        let file = file.into();
        let arity = |name: &str| {
            ast.iter_functions()
                .find(|f| f.name == name)
                .map(|f| f.params.len())
        };
        let hook = |name: &str, expected: usize| match arity(name) {
            Some(n) if n == expected => true,
            Some(n) => {
                log::warn!(
                    "Script '{}': {} takes {} parameter(s), expected {}; ignoring it",
                    file, name, n, expected
                );
                false
            }
            None => false,
        };
        let has_init = hook("init", 1);
        let has_update = hook("update", 2);
        let has_cleanup = hook("cleanup", 1);
        Self {
            engine,
            ast,
            file,
            scope: Scope::new(),
            has_init,
            has_update,
            has_cleanup,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    fn call(&mut self, hook: &'static str, ctx: &mut ScriptContext, args: impl FuncArgs) -> Result<(), ScriptError> {
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut ctx.this);
        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, hook, args)
            .map(|_| ())
            .map_err(|err| ScriptError::Hook {
                file: self.file.clone(),
                hook,
                message: err.to_string(),
            })
    }
}

impl ScriptModule for RhaiModule {
    fn init(&mut self, obj: &ScriptSandbox, ctx: &mut ScriptContext) -> Result<(), ScriptError> {
        if !self.has_init {
            return Ok(());
        }
        self.call("init", ctx, (obj.clone(),))
    }

    fn update(&mut self, obj: &ScriptSandbox, ctx: &mut ScriptContext, dt: f32) -> Result<(), ScriptError> {
        if !self.has_update {
            return Ok(());
        }
        self.call("update", ctx, (obj.clone(), dt))
    }

    fn cleanup(&mut self, obj: &ScriptSandbox, ctx: &mut ScriptContext) -> Result<(), ScriptError> {
        if !self.has_cleanup {
            return Ok(());
        }
        self.call("cleanup", ctx, (obj.clone(),))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_a_map_until_replaced() {
        let mut ctx = ScriptContext::default();
        ctx.set("hits", Dynamic::from_int(2));
        assert_eq!(ctx.get("hits").and_then(|v| v.as_int().ok()), Some(2));

        ctx.this = Dynamic::from_int(5);
        ctx.set("hits", Dynamic::from_int(3));
        assert!(ctx.get("hits").is_none());
    }
}
