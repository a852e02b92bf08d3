//! Remote-then-local policy. Every operation tries Supabase once and falls
//! back to the SQLite mirror when Supabase is unreachable or erroring; the
//! two stores are never reconciled.

use crate::errors::AdminError;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Supabase,
    Local,
}

#[derive(Debug, Clone)]
pub struct Sourced<T> {
    pub data: T,
    pub source: Source,
}

/// Remote rows when the call succeeds with at least one row, local rows otherwise.
pub async fn read<T, R, L>(resource: &str, remote: R, local: L) -> Result<Sourced<Vec<T>>, AdminError>
where
    R: Future<Output = Result<Vec<T>, AdminError>>,
    L: Future<Output = Result<Vec<T>, AdminError>>,
{
    match remote.await {
        Ok(rows) if !rows.is_empty() => {
            return Ok(Sourced {
                data: rows,
                source: Source::Supabase,
            })
        }
        Ok(_) => tracing::debug!(resource, "remote list empty, reading local store"),
        Err(e) => tracing::warn!(resource, error = %e, "remote read failed, reading local store"),
    }

    Ok(Sourced {
        data: local.await?,
        source: Source::Local,
    })
}

pub async fn write<T, R, L>(resource: &str, remote: R, local: L) -> Result<Sourced<T>, AdminError>
where
    R: Future<Output = Result<T, AdminError>>,
    L: Future<Output = Result<T, AdminError>>,
{
    match remote.await {
        Ok(data) => Ok(Sourced {
            data,
            source: Source::Supabase,
        }),
        Err(e) if !e.is_remote_failure() => Err(e),
        Err(e) => {
            tracing::warn!(resource, error = %e, "remote write failed, writing local store");
            Ok(Sourced {
                data: local.await?,
                source: Source::Local,
            })
        }
    }
}

/// `local` yields the number of deleted rows; zero means the id is unknown.
pub async fn delete<R, L>(resource: &str, id: &str, remote: R, local: L) -> Result<Source, AdminError>
where
    R: Future<Output = Result<(), AdminError>>,
    L: Future<Output = Result<u64, AdminError>>,
{
    match remote.await {
        Ok(()) => Ok(Source::Supabase),
        Err(e) if !e.is_remote_failure() => Err(e),
        Err(e) => {
            tracing::warn!(resource, error = %e, "remote delete failed, deleting from local store");
            if local.await? == 0 {
                return Err(AdminError::not_found(format!("{resource} {id} not found")));
            }
            Ok(Source::Local)
        }
    }
}

/// Serializes local rows into the loosely typed shape remote rows have.
pub fn to_values<T: Serialize>(rows: Vec<T>) -> Result<Vec<Value>, AdminError> {
    rows.into_iter()
        .map(|r| serde_json::to_value(r).map_err(AdminError::from))
        .collect()
}

pub fn to_value<T: Serialize>(row: T) -> Result<Value, AdminError> {
    Ok(serde_json::to_value(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn down() -> AdminError {
        AdminError::Upstream {
            service: "Supabase",
            status: 503,
            body: "unavailable".into(),
        }
    }

    #[tokio::test]
    async fn test_read_prefers_remote_rows() {
        let local_called = AtomicBool::new(false);
        let res = read(
            "products",
            async { Ok(vec![json!({"id": 1})]) },
            async {
                local_called.store(true, Ordering::SeqCst);
                Ok(vec![])
            },
        )
        .await
        .unwrap();

        assert_eq!(res.source, Source::Supabase);
        assert_eq!(res.data.len(), 1);
        assert!(!local_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_falls_back_on_empty_and_on_error() {
        let empty = read("products", async { Ok(Vec::<Value>::new()) }, async {
            Ok(vec![json!({"id": "local"})])
        })
        .await
        .unwrap();
        assert_eq!(empty.source, Source::Local);

        let failed = read("products", async { Err(down()) }, async {
            Ok(vec![json!({"id": "local"})])
        })
        .await
        .unwrap();
        assert_eq!(failed.source, Source::Local);
        assert_eq!(failed.data[0]["id"], "local");
    }

    #[tokio::test]
    async fn test_read_propagates_local_errors() {
        let res: Result<Sourced<Vec<Value>>, _> = read("products", async { Err(down()) }, async {
            Err(AdminError::Other("disk full".into()))
        })
        .await;
        assert!(matches!(res, Err(AdminError::Other(_))));
    }

    #[tokio::test]
    async fn test_write_uses_local_only_after_remote_failure() {
        let ok = write("users", async { Ok(json!({"id": 7})) }, async {
            Err(AdminError::Other("local write must not run".into()))
        })
        .await
        .unwrap();
        assert_eq!(ok.source, Source::Supabase);
        assert_eq!(ok.data["id"], 7);

        let fallback = write("users", async { Err(down()) }, async { Ok(json!({"id": 1})) })
            .await
            .unwrap();
        assert_eq!(fallback.source, Source::Local);
    }

    #[tokio::test]
    async fn test_write_keeps_remote_answers_that_are_not_outages() {
        let local_called = AtomicBool::new(false);
        let res = write(
            "products",
            async { Err::<Value, _>(AdminError::not_found("Product 1 not found")) },
            async {
                local_called.store(true, Ordering::SeqCst);
                Ok(json!({"id": 1}))
            },
        )
        .await;
        assert!(matches!(res, Err(AdminError::NotFound(_))));
        assert!(!local_called.load(Ordering::SeqCst));

        let unconfigured = write(
            "products",
            async { Err(AdminError::NotConfigured("Supabase")) },
            async { Ok(json!({"id": 2})) },
        )
        .await
        .unwrap();
        assert_eq!(unconfigured.source, Source::Local);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_rows() {
        let remote_ok = delete("vehicle", "3", async { Ok(()) }, async { Ok(0) }).await;
        assert_eq!(remote_ok.unwrap(), Source::Supabase);

        let local_hit = delete("vehicle", "3", async { Err(down()) }, async { Ok(1) }).await;
        assert_eq!(local_hit.unwrap(), Source::Local);

        let missing = delete("vehicle", "3", async { Err(down()) }, async { Ok(0) }).await;
        assert!(matches!(missing, Err(AdminError::NotFound(_))));
    }
}
