use folio_core::{
  actor::Actor,
  search::{IndexError, SearchIndex, SearchRequest, SearchResults},
  store::CatalogStore,
  visibility,
};

use crate::{Catalog, Result};

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  /// Search under the actor's visibility scope.
  ///
  /// Malformed query text is not an error: the results carry the
  /// user-facing message instead. An unreachable index is.
  pub async fn search(
    &self,
    actor: &Actor,
    mut request: SearchRequest,
  ) -> Result<SearchResults> {
    self.plugins.before_search(actor, &mut request)?;
    let scope = visibility::scope(actor, &request, &self.search);

    let mut results = match self.index.query(&scope, &request, &self.search).await {
      Ok(results) => results,
      Err(IndexError::Query(reason)) => {
        tracing::debug!(q = ?request.q, %reason, "rejected search query");
        SearchResults::query_error()
      }
      Err(e) => return Err(e.into()),
    };
    self.plugins.after_search(actor, &mut results);
    Ok(results)
  }
}
