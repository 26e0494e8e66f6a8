//! 查询结果记录服务 - 业务能力层
//!
//! 每个请求结束时写一行 JSON，同一个请求 id 只写一次

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LookupError, Result};
use crate::models::{CaseRecord, SearchCriteria};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// 查询结果的持久化出口
///
/// 实现必须对同一个 `request_id` 幂等。
#[async_trait]
pub trait OutcomeRecorder: Send + Sync {
    async fn record_outcome(
        &self,
        request_id: &str,
        criteria: &SearchCriteria,
        status: OutcomeStatus,
        error_message: Option<&str>,
        record: Option<&CaseRecord>,
    ) -> Result<()>;
}

#[derive(Serialize)]
struct OutcomeLine<'a> {
    request_id: &'a str,
    recorded_at: String,
    criteria: &'a SearchCriteria,
    status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a CaseRecord>,
}

#[derive(Deserialize)]
struct RecordedId {
    request_id: String,
}

/// 追加写入 JSONL 文件
pub struct JsonlOutcomeRecorder {
    path: PathBuf,
    recorded: Mutex<HashSet<String>>,
}

impl JsonlOutcomeRecorder {
    /// 打开记录文件，已有记录的请求 id 会被载入
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let recorded = load_recorded_ids(&path)?;
        debug!("载入 {} 条已有记录: {}", recorded.len(), path.display());
        Ok(Self {
            path,
            recorded: Mutex::new(recorded),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_recorded_ids(path: &Path) -> Result<HashSet<String>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(LookupError::Config(format!(
                "无法读取记录文件 {}: {}",
                path.display(),
                e
            )))
        }
    };

    let mut ids = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| LookupError::Config(format!("读取记录文件失败: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RecordedId>(&line) {
            Ok(entry) => {
                ids.insert(entry.request_id);
            }
            Err(e) => warn!("跳过无法识别的记录行: {}", e),
        }
    }
    Ok(ids)
}

#[async_trait]
impl OutcomeRecorder for JsonlOutcomeRecorder {
    async fn record_outcome(
        &self,
        request_id: &str,
        criteria: &SearchCriteria,
        status: OutcomeStatus,
        error_message: Option<&str>,
        record: Option<&CaseRecord>,
    ) -> Result<()> {
        let line = OutcomeLine {
            request_id,
            recorded_at: Utc::now().to_rfc3339(),
            criteria,
            status,
            error_message,
            record,
        };
        let mut json = serde_json::to_string(&line)
            .map_err(|e| LookupError::Config(format!("无法序列化查询记录: {}", e)))?;
        json.push('\n');

        // 检查与写入在同一把锁内完成，保证同一个 id 只落盘一次
        let mut recorded = self
            .recorded
            .lock()
            .map_err(|_| LookupError::Config("记录锁已损坏".to_string()))?;
        if recorded.contains(request_id) {
            debug!("请求 {} 已记录，跳过", request_id);
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LookupError::Config(format!("无法打开记录文件: {}", e)))?;
        file.write_all(json.as_bytes())
            .map_err(|e| LookupError::Config(format!("写入记录文件失败: {}", e)))?;

        recorded.insert(request_id.to_string());
        debug!("已记录请求 {} ({:?})", request_id, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> SearchCriteria {
        SearchCriteria::new("W.P.(C)", "11199", "2025").unwrap()
    }

    #[tokio::test]
    async fn same_request_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        let recorder = JsonlOutcomeRecorder::open(&path).unwrap();

        for _ in 0..3 {
            recorder
                .record_outcome("req-1", &criteria(), OutcomeStatus::Failed, Some("超时"), None)
                .await
                .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_message"], "超时");
        assert_eq!(value["criteria"]["case_number"], "11199");
        assert!(value.get("record").is_none());
    }

    #[tokio::test]
    async fn ids_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");

        let first = JsonlOutcomeRecorder::open(&path).unwrap();
        first
            .record_outcome("req-1", &criteria(), OutcomeStatus::Success, None, None)
            .await
            .unwrap();
        drop(first);

        let second = JsonlOutcomeRecorder::open(&path).unwrap();
        second
            .record_outcome("req-1", &criteria(), OutcomeStatus::Success, None, None)
            .await
            .unwrap();
        second
            .record_outcome("req-2", &criteria(), OutcomeStatus::Failed, Some("x"), None)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
