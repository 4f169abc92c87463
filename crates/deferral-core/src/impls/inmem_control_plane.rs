//! InMemoryControlPlane - ローカル開発用のタスクキュー制御プレーン
//!
//! 本物の制御プレーン（やそのエミュレータ）の代わりに、作成されたタスクを
//! メモリ上に記録します。inline body の上限（既定 100 KiB）を超えるタスクは
//! 本物と同じ `InvalidArgument: Task size too large` で拒否します。
//!
//! # テスト用の機能
//! - `fail_next`: 次の呼び出しを指定エラーで失敗させる
//! - `lose_next_response`: タスクは作成するが応答はエラーにする（応答消失）

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::TaskMessage;
use crate::ports::{ControlPlaneCode, ControlPlaneError, TaskAck, TaskControlPlane};

/// Inline body ceiling the hosted queue enforces.
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub queue_path: String,
    pub message: TaskMessage,
}

struct Scripted {
    error: ControlPlaneError,
    accept: bool,
}

#[derive(Default)]
struct State {
    created: Vec<CreatedTask>,
    names: HashSet<String>,
    script: VecDeque<Scripted>,
    calls: usize,
}

pub struct InMemoryControlPlane {
    max_body_bytes: usize,
    state: Mutex<State>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::with_max_body_bytes(DEFAULT_MAX_BODY_BYTES)
    }

    pub fn with_max_body_bytes(max_body_bytes: usize) -> Self {
        Self {
            max_body_bytes,
            state: Mutex::new(State::default()),
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Fails the next call with `error` without creating anything.
    pub fn fail_next(&self, error: ControlPlaneError) {
        self.with_state(|s| s.script.push_back(Scripted { error, accept: false }));
    }

    /// Creates the next task but reports `error` to the caller.
    pub fn lose_next_response(&self, error: ControlPlaneError) {
        self.with_state(|s| s.script.push_back(Scripted { error, accept: true }));
    }

    /// Every `create_task` call, including rejected ones.
    pub fn calls(&self) -> usize {
        self.with_state(|s| s.calls)
    }

    pub fn created(&self) -> Vec<CreatedTask> {
        self.with_state(|s| s.created.clone())
    }

    /// Hands out accepted tasks for delivery; each one only once.
    pub fn drain(&self) -> Vec<CreatedTask> {
        self.with_state(|s| std::mem::take(&mut s.created))
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskControlPlane for InMemoryControlPlane {
    async fn create_task(
        &self,
        queue_path: &str,
        task: &TaskMessage,
    ) -> Result<TaskAck, ControlPlaneError> {
        let max_body_bytes = self.max_body_bytes;
        self.with_state(|state| {
            state.calls += 1;

            let scripted = match state.script.pop_front() {
                Some(Scripted { error, accept: false }) => return Err(error),
                other => other,
            };

            if task.body_len() > max_body_bytes {
                return Err(ControlPlaneError::body_too_large(task.body_len(), max_body_bytes));
            }

            let full_name = format!("{queue_path}/tasks/{}", task.name);
            if !state.names.insert(full_name.clone()) {
                return Err(ControlPlaneError::new(
                    ControlPlaneCode::AlreadyExists,
                    format!("task {full_name} already exists"),
                ));
            }

            state.created.push(CreatedTask {
                queue_path: queue_path.to_string(),
                message: task.clone(),
            });

            match scripted {
                Some(Scripted { error, .. }) => Err(error),
                None => Ok(TaskAck {
                    name: full_name,
                    schedule_time: task.schedule_time,
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, HttpRequest, RoutingOptions};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn message(name: &str, body_len: usize) -> TaskMessage {
        TaskMessage {
            name: name.to_string(),
            create_time: Utc::now(),
            schedule_time: None,
            http_request: HttpRequest {
                method: HttpMethod::Post,
                path: "/_tasks/deferred".to_string(),
                body: vec![b'x'; body_len],
                headers: BTreeMap::new(),
                routing: RoutingOptions::default(),
            },
        }
    }

    #[tokio::test]
    async fn records_created_tasks() {
        let plane = InMemoryControlPlane::new();
        let ack = plane.create_task("q", &message("a", 10)).await.unwrap();
        assert_eq!(ack.name, "q/tasks/a");
        assert_eq!(plane.created().len(), 1);
        assert_eq!(plane.drain().len(), 1);
        assert!(plane.created().is_empty());
    }

    #[tokio::test]
    async fn rejects_bodies_over_the_limit() {
        let plane = InMemoryControlPlane::with_max_body_bytes(16);
        let err = plane.create_task("q", &message("big", 17)).await.unwrap_err();
        assert!(err.is_body_too_large());
        assert!(plane.create_task("q", &message("fits", 16)).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_names_already_exist() {
        let plane = InMemoryControlPlane::new();
        plane.create_task("q", &message("dup", 1)).await.unwrap();
        let err = plane.create_task("q", &message("dup", 1)).await.unwrap_err();
        assert_eq!(err.code, ControlPlaneCode::AlreadyExists);
    }

    #[tokio::test]
    async fn scripted_failures_run_in_order() {
        let plane = InMemoryControlPlane::new();
        plane.fail_next(ControlPlaneError::new(ControlPlaneCode::Unavailable, "down"));
        plane.lose_next_response(ControlPlaneError::new(ControlPlaneCode::DeadlineExceeded, "slow"));

        let first = plane.create_task("q", &message("a", 1)).await.unwrap_err();
        assert_eq!(first.code, ControlPlaneCode::Unavailable);
        assert!(plane.created().is_empty());

        let second = plane.create_task("q", &message("a", 1)).await.unwrap_err();
        assert_eq!(second.code, ControlPlaneCode::DeadlineExceeded);
        assert_eq!(plane.created().len(), 1);
        assert_eq!(plane.calls(), 2);
    }
}
