use anyhow::{Context, Result};
use tracing::debug;

use crate::config::MigrateConfig;
use crate::rules;

type Hook = Box<dyn FnMut() -> Result<()>>;

/// Ordered list of callbacks the host invokes after its own build finishes.
/// Components register into the list instead of wrapping whatever callback
/// happened to be installed before them.
#[derive(Default)]
pub struct PostBuildHooks {
    hooks: Vec<(String, Hook)>,
}

impl PostBuildHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, hook: impl FnMut() -> Result<()> + 'static) {
        self.hooks.push((name.into(), Box::new(hook)));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Invoke every hook in registration order. The first failure aborts the
    /// sequence and propagates to the host.
    pub fn run(&mut self) -> Result<()> {
        for (name, hook) in &mut self.hooks {
            debug!(hook = %name, "running post-build hook");
            hook().with_context(|| format!("post-build hook `{name}` failed"))?;
        }
        Ok(())
    }
}

/// Lifecycle entry point: register the rewrite-rule emitter to run after the
/// host's build, so the rule file reflects the freshly written output
/// directory. No-op when the feature or rule generation is disabled.
pub fn init(config: &MigrateConfig, hooks: &mut PostBuildHooks) {
    if !config.enabled || !config.rules.generate {
        return;
    }
    let config = config.clone();
    hooks.register("rewrite-rules", move || {
        rules::write_rewrite_rules(&config)?;
        Ok(())
    });
}
