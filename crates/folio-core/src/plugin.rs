//! Extension points around search.
//!
//! Hooks run in registration order. A registry is built once at startup
//! and handed to the catalogue explicitly.

use std::sync::Arc;

use thiserror::Error;

use crate::{
  actor::Actor,
  search::{SearchRequest, SearchResults},
};

/// A hook's refusal to let a search proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("search vetoed by {plugin}: {reason}")]
pub struct Veto {
  pub plugin: String,
  pub reason: String,
}

pub trait SearchHook: Send + Sync {
  fn name(&self) -> &str;

  /// Inspect or rewrite the request before it reaches the index.
  fn before_search(
    &self,
    _actor: &Actor,
    _request: &mut SearchRequest,
  ) -> Result<(), Veto> {
    Ok(())
  }

  /// Inspect or rewrite the results before they reach the caller.
  fn after_search(&self, _actor: &Actor, _results: &mut SearchResults) {}
}

#[derive(Clone, Default)]
pub struct PluginRegistry {
  search_hooks: Vec<Arc<dyn SearchHook>>,
}

impl PluginRegistry {
  pub fn new() -> Self { Self::default() }

  pub fn with_search_hook(mut self, hook: Arc<dyn SearchHook>) -> Self {
    self.search_hooks.push(hook);
    self
  }

  pub fn register_search_hook(&mut self, hook: Arc<dyn SearchHook>) {
    self.search_hooks.push(hook);
  }

  pub fn search_hook_names(&self) -> Vec<&str> {
    self.search_hooks.iter().map(|h| h.name()).collect()
  }

  /// Stops at the first veto.
  pub fn before_search(
    &self,
    actor: &Actor,
    request: &mut SearchRequest,
  ) -> Result<(), Veto> {
    self
      .search_hooks
      .iter()
      .try_for_each(|hook| hook.before_search(actor, request))
  }

  pub fn after_search(&self, actor: &Actor, results: &mut SearchResults) {
    for hook in &self.search_hooks {
      hook.after_search(actor, results);
    }
  }
}

impl std::fmt::Debug for PluginRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PluginRegistry")
      .field("search_hooks", &self.search_hook_names())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  struct Counting {
    name:  &'static str,
    calls: AtomicUsize,
    veto:  bool,
  }

  impl SearchHook for Counting {
    fn name(&self) -> &str { self.name }

    fn before_search(
      &self,
      _actor: &Actor,
      request: &mut SearchRequest,
    ) -> Result<(), Veto> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.veto {
        return Err(Veto { plugin: self.name.into(), reason: "no".into() });
      }
      request.rows = Some(5);
      Ok(())
    }
  }

  fn hook(name: &'static str, veto: bool) -> Arc<Counting> {
    Arc::new(Counting { name, calls: AtomicUsize::new(0), veto })
  }

  #[test]
  fn hooks_run_in_order_and_stop_at_veto() {
    let first = hook("first", false);
    let second = hook("second", true);
    let third = hook("third", false);
    let registry = PluginRegistry::new()
      .with_search_hook(first.clone())
      .with_search_hook(second.clone())
      .with_search_hook(third.clone());

    let mut request = SearchRequest::default();
    let veto = registry
      .before_search(&Actor::Anonymous, &mut request)
      .unwrap_err();

    assert_eq!(veto.plugin, "second");
    assert_eq!(request.rows, Some(5));
    assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    assert_eq!(third.calls.load(Ordering::SeqCst), 0);
  }
}
