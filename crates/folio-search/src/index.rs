//! [`SqliteIndex`], the FTS5 implementation of [`SearchIndex`].

use std::path::Path;

use folio_core::{
  dataset::DatasetDict,
  search::{
    FacetCount, FacetField, IndexDocument, IndexError, IndexOutcome,
    SearchConfig, SearchIndex, SearchRequest, SearchResults, SortOrder,
  },
  visibility::SearchScope,
};
use rusqlite::{
  Connection, OptionalExtension as _, params, params_from_iter, types::Value,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
  error::classify,
  query::{self, ParsedQuery},
  schema::SCHEMA,
};

/// Most distinct values reported per facet field.
const FACET_LIMIT: usize = 50;

// ─── Index ───────────────────────────────────────────────────────────────────

/// A search index backed by SQLite's FTS5 extension.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteIndex {
  conn: tokio_rusqlite::Connection,
}

impl SqliteIndex {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(classify)?;
    let index = Self { conn };
    index.init_schema().await?;
    Ok(index)
  }

  pub async fn open_in_memory() -> Result<Self, IndexError> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(classify)?;
    let index = Self { conn };
    index.init_schema().await?;
    Ok(index)
  }

  async fn init_schema(&self) -> Result<(), IndexError> {
    self.call(|conn| conn.execute_batch(SCHEMA)).await
  }

  async fn call<T, F>(&self, f: F) -> Result<T, IndexError>
  where
    F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| Ok(f(conn)?))
      .await
      .map_err(classify)
  }

  /// Run `f`, retrying once if the database could not be reached.
  async fn call_with_retry<T, F>(&self, op: &'static str, f: F) -> Result<T, IndexError>
  where
    F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Clone + Send + 'static,
    T: Send + 'static,
  {
    retry_once(op, || self.call(f.clone())).await
  }
}

/// Run `attempt`, running it a second time only if the first failure was
/// transient.
pub(crate) async fn retry_once<T, Fut>(
  op: &'static str,
  mut attempt: impl FnMut() -> Fut,
) -> Result<T, IndexError>
where
  Fut: Future<Output = Result<T, IndexError>>,
{
  match attempt().await {
    Err(e) if e.is_transient() => {
      tracing::warn!(op, error = %e, "search index unavailable; retrying once");
      attempt().await
    }
    other => other,
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

fn content_hash(dict_json: &str, labels: &[String]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(dict_json.as_bytes());
  for label in labels {
    hasher.update([0u8]);
    hasher.update(label.as_bytes());
  }
  hex::encode(hasher.finalize())
}

fn delete_rows(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
  conn.execute("DELETE FROM documents_fts WHERE dataset_id = ?1", params![id])?;
  conn.execute("DELETE FROM document_labels WHERE dataset_id = ?1", params![id])?;
  conn.execute("DELETE FROM document_facets WHERE dataset_id = ?1", params![id])?;
  conn.execute("DELETE FROM documents WHERE dataset_id = ?1", params![id])
}

fn write_document(
  conn: &mut Connection,
  doc: &IndexDocument,
  dict_json: &str,
  hash: &str,
) -> rusqlite::Result<IndexOutcome> {
  let id = doc.dataset_id.to_string();
  let tx = conn.transaction()?;

  let existing: Option<String> = tx
    .query_row(
      "SELECT content_hash FROM documents WHERE dataset_id = ?1",
      params![id],
      |row| row.get(0),
    )
    .optional()?;
  if existing.as_deref() == Some(hash) {
    return Ok(IndexOutcome::Unchanged);
  }
  if existing.is_some() {
    delete_rows(&tx, &id)?;
  }

  tx.execute(
    "INSERT INTO documents (
       dataset_id, name, title, private, state, metadata_modified,
       content_hash, dict_json
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      id,
      doc.name,
      doc.title,
      doc.private,
      doc.state.as_ref(),
      doc
        .metadata_modified
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
      hash,
      dict_json,
    ],
  )?;
  for label in &doc.labels {
    tx.execute(
      "INSERT INTO document_labels (dataset_id, label) VALUES (?1, ?2)",
      params![id, label],
    )?;
  }
  for field in [FacetField::Tags, FacetField::Organization, FacetField::ResFormat] {
    for value in doc.facet_values(field) {
      tx.execute(
        "INSERT OR IGNORE INTO document_facets (dataset_id, field, value)
         VALUES (?1, ?2, ?3)",
        params![id, field.as_ref(), value],
      )?;
    }
  }
  tx.execute(
    "INSERT INTO documents_fts (
       dataset_id, name, title, notes, tags, res_text, res_format, organization
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      id,
      doc.name,
      doc.title,
      doc.notes,
      doc.tags.join(" "),
      doc.res_text,
      doc.res_formats.join(" "),
      doc.organization.as_deref().unwrap_or_default(),
    ],
  )?;
  tx.commit()?;

  Ok(if existing.is_some() {
    IndexOutcome::Updated
  } else {
    IndexOutcome::Inserted
  })
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// A `FROM ... WHERE ...` fragment with its positional arguments, shared by
/// the count, page and facet queries.
#[derive(Clone)]
struct Plan {
  from:   String,
  args:   Vec<Value>,
  ranked: bool,
}

impl Plan {
  fn build(parsed: &ParsedQuery, scope: &SearchScope, request: &SearchRequest) -> Self {
    let mut from = String::from("FROM documents d");
    let mut args = Vec::new();
    let ranked = parsed.positive.is_some();

    if let Some(expr) = &parsed.positive {
      from.push_str(
        " JOIN (SELECT dataset_id, rank AS score FROM documents_fts
                WHERE documents_fts MATCH ?) m ON m.dataset_id = d.dataset_id",
      );
      args.push(Value::Text(expr.clone()));
    }

    let mut conds: Vec<String> = vec!["d.state != 'deleted'".into()];
    if parsed.matches_none {
      conds.push("0".into());
    }
    if !scope.include_drafts {
      conds.push("d.state = 'active'".into());
    }
    if !scope.include_private {
      conds.push("d.private = 0".into());
    }
    match &scope.labels {
      None => {}
      Some(labels) if labels.is_empty() => conds.push("0".into()),
      Some(labels) => {
        let marks = vec!["?"; labels.len()].join(", ");
        conds.push(format!(
          "EXISTS (SELECT 1 FROM document_labels l
                   WHERE l.dataset_id = d.dataset_id AND l.label IN ({marks}))"
        ));
        args.extend(labels.iter().cloned().map(Value::Text));
      }
    }
    for expr in &parsed.negative {
      conds.push(
        "d.dataset_id NOT IN (SELECT dataset_id FROM documents_fts
                              WHERE documents_fts MATCH ?)"
          .into(),
      );
      args.push(Value::Text(expr.clone()));
    }
    for filter in &request.filters {
      conds.push(
        "EXISTS (SELECT 1 FROM document_facets f
                 WHERE f.dataset_id = d.dataset_id AND f.field = ? AND f.value = ?)"
          .into(),
      );
      let value = match filter.field {
        FacetField::ResFormat => filter.value.trim().to_uppercase(),
        _ => filter.value.clone(),
      };
      args.push(Value::Text(filter.field.as_ref().to_owned()));
      args.push(Value::Text(value));
    }

    from.push_str(" WHERE ");
    from.push_str(&conds.join(" AND "));
    Self { from, args, ranked }
  }

  fn order_by(&self, sort: SortOrder) -> &'static str {
    match sort {
      SortOrder::Relevance if self.ranked => {
        "m.score ASC, d.metadata_modified DESC"
      }
      SortOrder::Relevance => "d.metadata_modified DESC",
      SortOrder::NameAsc => "d.name ASC",
      SortOrder::NameDesc => "d.name DESC",
      SortOrder::TitleAsc => "d.title COLLATE NOCASE ASC, d.name ASC",
      SortOrder::TitleDesc => "d.title COLLATE NOCASE DESC, d.name DESC",
      SortOrder::ModifiedAsc => "d.metadata_modified ASC",
      SortOrder::ModifiedDesc => "d.metadata_modified DESC",
    }
  }
}

struct RawResults {
  count:  usize,
  dicts:  Vec<String>,
  facets: Vec<(FacetField, Vec<(String, usize)>)>,
}

fn run_query(
  conn: &Connection,
  plan: &Plan,
  sort: SortOrder,
  rows: usize,
  start: usize,
  facet_fields: &[FacetField],
) -> rusqlite::Result<RawResults> {
  let count: i64 = conn.query_row(
    &format!("SELECT COUNT(*) {}", plan.from),
    params_from_iter(plan.args.iter()),
    |row| row.get(0),
  )?;

  let mut page_args = plan.args.clone();
  page_args.push(Value::Integer(i64::try_from(rows).unwrap_or(i64::MAX)));
  page_args.push(Value::Integer(i64::try_from(start).unwrap_or(i64::MAX)));
  let mut stmt = conn.prepare(&format!(
    "SELECT d.dict_json {} ORDER BY {} LIMIT ? OFFSET ?",
    plan.from,
    plan.order_by(sort)
  ))?;
  let dicts = stmt
    .query_map(params_from_iter(page_args.iter()), |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;

  let mut facets = Vec::with_capacity(facet_fields.len());
  for &field in facet_fields {
    let mut args = vec![Value::Text(field.as_ref().to_owned())];
    args.extend(plan.args.iter().cloned());
    let mut stmt = conn.prepare(&format!(
      "SELECT f.value, COUNT(*) FROM document_facets f
       WHERE f.field = ? AND f.dataset_id IN (SELECT d.dataset_id {})
       GROUP BY f.value
       ORDER BY COUNT(*) DESC, f.value ASC
       LIMIT {FACET_LIMIT}",
      plan.from
    ))?;
    let counts = stmt
      .query_map(params_from_iter(args.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    facets.push((field, counts));
  }

  Ok(RawResults { count: count as usize, dicts, facets })
}

fn decode_uuid(s: &str) -> Result<Uuid, IndexError> {
  Uuid::parse_str(s).map_err(|e| IndexError::Backend(e.to_string()))
}

// ─── SearchIndex impl ────────────────────────────────────────────────────────

impl SearchIndex for SqliteIndex {
  async fn index(&self, doc: IndexDocument) -> Result<IndexOutcome, IndexError> {
    let dict_json = serde_json::to_string(&doc.dict)
      .map_err(|e| IndexError::Backend(e.to_string()))?;
    let hash = content_hash(&dict_json, &doc.labels);
    let id = doc.dataset_id;

    let outcome = self
      .call_with_retry("index", move |conn| {
        write_document(conn, &doc, &dict_json, &hash)
      })
      .await?;
    tracing::debug!(dataset = %id, ?outcome, "indexed dataset");
    Ok(outcome)
  }

  async fn unindex(&self, dataset_id: Uuid) -> Result<bool, IndexError> {
    let id = dataset_id.to_string();
    let removed = self
      .call_with_retry("unindex", move |conn| {
        let tx = conn.transaction()?;
        let removed = delete_rows(&tx, &id)?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    tracing::debug!(dataset = %dataset_id, removed, "unindexed dataset");
    Ok(removed > 0)
  }

  async fn query(
    &self,
    scope: &SearchScope,
    request: &SearchRequest,
    config: &SearchConfig,
  ) -> Result<SearchResults, IndexError> {
    let parsed = query::parse(request.q.as_deref().unwrap_or(""))?;
    let plan = Plan::build(&parsed, scope, request);
    let sort = request.sort;
    let rows = request.page_size(config);
    let start = request.start;
    let facet_fields = request.facet_fields.clone();

    let raw = self
      .call_with_retry("query", move |conn| {
        run_query(conn, &plan, sort, rows, start, &facet_fields)
      })
      .await?;

    let results = raw
      .dicts
      .iter()
      .map(|json| serde_json::from_str::<DatasetDict>(json))
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| IndexError::Backend(e.to_string()))?;
    let facets = raw
      .facets
      .into_iter()
      .map(|(field, counts)| {
        let counts = counts
          .into_iter()
          .map(|(value, count)| FacetCount { value, count })
          .collect();
        (field.as_ref().to_owned(), counts)
      })
      .collect();

    tracing::debug!(q = ?request.q, count = raw.count, "search query");
    Ok(SearchResults { count: raw.count, results, facets, error: None })
  }

  async fn clear(&self) -> Result<usize, IndexError> {
    let removed = self
      .call_with_retry("clear", |conn| {
        let tx = conn.transaction()?;
        let count: i64 =
          tx.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        tx.execute_batch(
          "DELETE FROM documents_fts;
           DELETE FROM document_labels;
           DELETE FROM document_facets;
           DELETE FROM documents;",
        )?;
        tx.commit()?;
        Ok(count as usize)
      })
      .await?;
    tracing::info!(removed, "search index cleared");
    Ok(removed)
  }

  async fn indexed_ids(&self) -> Result<Vec<Uuid>, IndexError> {
    let ids = self
      .call_with_retry("indexed_ids", |conn| {
        let mut stmt =
          conn.prepare("SELECT dataset_id FROM documents ORDER BY dataset_id")?;
        stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn count(&self) -> Result<usize, IndexError> {
    self
      .call_with_retry("count", |conn| {
        conn
          .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
          .map(|n| n as usize)
      })
      .await
  }
}
