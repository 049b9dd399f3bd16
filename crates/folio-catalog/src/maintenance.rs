//! Keeping the search index in step with the store.
//!
//! The index mirrors every dataset that is not deleted. Drafts are indexed
//! too, so their creators can find them with `include_drafts`; the
//! visibility scope keeps them from everyone else.

use std::collections::HashSet;

use folio_core::{
  dataset::{DatasetDict, DatasetState},
  search::{IndexDocument, IndexError, IndexOutcome, SearchIndex},
  store::{CatalogStore, DatasetFilter},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Catalog, Error, Result, error::store_error};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildOptions {
  /// Only index datasets absent from the index.
  pub only_missing: bool,
  /// Log per-dataset failures and carry on instead of stopping.
  pub force:        bool,
  /// Re-index in place rather than clearing first.
  pub refresh:      bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
  pub indexed:   usize,
  pub unchanged: usize,
  /// Documents dropped, by clearing or because their dataset is gone.
  pub removed:   usize,
  pub failed:    Vec<Uuid>,
}

impl RebuildReport {
  fn record(&mut self, outcome: Option<IndexOutcome>) {
    match outcome {
      Some(IndexOutcome::Unchanged) => self.unchanged += 1,
      Some(_) => self.indexed += 1,
      None => self.removed += 1,
    }
  }
}

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  /// Index a dataset, or unindex it if it is deleted. `None` means it was
  /// unindexed.
  async fn reindex(&self, dict: &DatasetDict) -> Result<Option<IndexOutcome>, IndexError> {
    if dict.dataset.state == DatasetState::Deleted {
      self.index.unindex(dict.dataset.dataset_id).await?;
      return Ok(None);
    }
    self
      .index
      .index(IndexDocument::from_dict(dict))
      .await
      .map(Some)
  }

  /// Best effort: the store is the source of truth and a later rebuild
  /// repairs any drift.
  pub(crate) async fn sync_index(&self, dict: &DatasetDict) {
    if let Err(e) = self.reindex(dict).await {
      tracing::warn!(
        dataset = %dict.dataset.dataset_id,
        error = %e,
        "search index update failed"
      );
    }
  }

  /// Remove one dataset's document, or every document. Returns how many
  /// were removed.
  pub async fn clear_index(&self, dataset: Option<&str>) -> Result<usize> {
    let removed = match dataset {
      Some(id_or_name) => {
        let dataset = self.require_dataset(id_or_name).await?;
        usize::from(self.index.unindex(dataset.dataset_id).await?)
      }
      None => self.index.clear().await?,
    };
    tracing::info!(removed, "cleared search index");
    Ok(removed)
  }

  pub async fn rebuild_index(
    &self,
    dataset: Option<&str>,
    options: RebuildOptions,
  ) -> Result<RebuildReport> {
    let mut report = RebuildReport::default();

    if let Some(id_or_name) = dataset {
      let dataset = self.require_dataset(id_or_name).await?;
      let dict = self.dictize(dataset.dataset_id).await?;
      report.record(self.reindex(&dict).await?);
      return Ok(report);
    }

    let mut datasets = self
      .store
      .list_datasets(DatasetFilter::default())
      .await
      .map_err(store_error)?;
    let indexed: HashSet<Uuid> = self.index.indexed_ids().await?.into_iter().collect();

    if options.only_missing {
      datasets.retain(|d| !indexed.contains(&d.dataset_id));
    } else if options.refresh {
      let live: HashSet<Uuid> = datasets.iter().map(|d| d.dataset_id).collect();
      for stale in indexed.difference(&live) {
        if self.index.unindex(*stale).await? {
          report.removed += 1;
        }
      }
    } else {
      report.removed += self.index.clear().await?;
    }

    tracing::info!(count = datasets.len(), "indexing datasets");
    for dataset in datasets {
      let result = match self.dictize(dataset.dataset_id).await {
        Ok(dict) => self.reindex(&dict).await.map_err(Error::from),
        Err(e) => Err(e),
      };
      match result {
        Ok(outcome) => report.record(outcome),
        Err(e) if options.force => {
          tracing::warn!(dataset = %dataset.dataset_id, error = %e, "failed to index dataset");
          report.failed.push(dataset.dataset_id);
        }
        Err(e) => return Err(e),
      }
    }

    tracing::info!(
      indexed = report.indexed,
      unchanged = report.unchanged,
      removed = report.removed,
      failed = report.failed.len(),
      "search index rebuilt"
    );
    Ok(report)
  }
}
