//! AppBuilder - Scheduler と Runner の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use super::config::DeferConfig;
use super::runner::Runner;
use super::scheduler::Scheduler;
use crate::ports::{Clock, IdGenerator, OverflowStore, SystemClock, TaskControlPlane, UlidGenerator};
use crate::typed::{RegistryError, Runnable, TypedRegistry};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(DeferConfig::from_env()?)
///     .register::<SendWelcomeMail>()?
///     .control_plane(client)
///     .overflow_store(store)
///     .expect_tasks(&["acme.mail.welcome.v1"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_tasks() で期待される task_type を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - control plane と overflow store は必須、clock と id 生成器は省略可
pub struct AppBuilder {
    config: DeferConfig,
    registry: TypedRegistry,
    expected_tasks: Option<Vec<String>>,
    control_plane: Option<Arc<dyn TaskControlPlane>>,
    overflow_store: Option<Arc<dyn OverflowStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error("Missing component: {0}")]
    MissingComponent(&'static str),
}

impl AppBuilder {
    pub fn new(config: DeferConfig) -> Self {
        Self {
            config,
            registry: TypedRegistry::new(),
            expected_tasks: None,
            control_plane: None,
            overflow_store: None,
            clock: None,
            ids: None,
        }
    }

    /// Runnable 型を登録
    pub fn register<T: Runnable>(mut self) -> Result<Self, RegistryError> {
        self.registry.register::<T>()?;
        Ok(self)
    }

    pub fn control_plane(mut self, control_plane: Arc<dyn TaskControlPlane>) -> Self {
        self.control_plane = Some(control_plane);
        self
    }

    pub fn overflow_store(mut self, store: Arc<dyn OverflowStore>) -> Self {
        self.overflow_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// 期待される task_type のリストを設定
    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// 検証してから Scheduler と Runner を組み立てる
    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|t| !self.registry.contains(t))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }

        let control_plane = self
            .control_plane
            .ok_or(BuildError::MissingComponent("control_plane"))?;
        let store = self
            .overflow_store
            .ok_or(BuildError::MissingComponent("overflow_store"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));

        if self.config.project.is_none() || self.config.location.is_none() {
            tracing::warn!("queue project/location not configured; every defer will fail");
        }
        tracing::info!(
            tasks = ?self.registry.registered_types(),
            version = %self.config.version,
            "deferral app built"
        );

        let scheduler = Scheduler::new(&self.config, control_plane, store.clone(), clock, ids);
        let runner = Runner::new(&self.config, Arc::new(self.registry), store);
        Ok(App { scheduler, runner })
    }
}

/// App は送信側と受信側のペア
pub struct App {
    pub scheduler: Scheduler,
    pub runner: Runner,
}
