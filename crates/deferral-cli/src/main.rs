use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use deferral_core::app::{AppBuilder, DeferConfig, OverflowSweeper, Runner};
use deferral_core::domain::{DeferError, RawTaskOptions};
use deferral_core::impls::{InMemoryControlPlane, InMemoryOverflowStore, InMemoryTransaction};
use deferral_core::ports::{Clock, IdGenerator, NoTransaction, SystemClock, UlidGenerator};
use deferral_core::typed::Runnable;

#[derive(Debug, Serialize, Deserialize)]
struct Greet {
    name: String,
    /// 大きな添付で overflow 経路を通す
    #[serde(default)]
    attachment: String,
}

#[async_trait]
impl Runnable for Greet {
    const TYPE: &'static str = "demo.greet.v1";

    async fn run(&self) -> Result<(), DeferError> {
        println!(
            "Hello, {}! (attachment {} bytes)",
            self.name,
            self.attachment.len()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) 設定。デモなので project / location が無ければ埋める
    let mut config = DeferConfig::from_env()?;
    if config.project.is_none() || config.location.is_none() {
        config = config.with_project("demo-project", "local");
    }

    // (B) in-memory の制御プレーンと overflow store でワイヤリング
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
    let plane = Arc::new(InMemoryControlPlane::new());
    tracing::info!(
        endpoint = config.control_plane_endpoint().unwrap_or("provider default"),
        max_body_bytes = plane.max_body_bytes(),
        "control plane: in-memory stand-in"
    );
    let store = Arc::new(InMemoryOverflowStore::new(ids.clone(), clock.clone()));

    let app = AppBuilder::new(config)
        .register::<Greet>()?
        .control_plane(plane.clone())
        .overflow_store(store.clone())
        .clock(clock.clone())
        .id_generator(ids)
        .expect_tasks(&[Greet::TYPE])
        .build()?;

    // (C) 小さいタスク、大きいタスク、トランザクション内のタスク
    let small = Greet {
        name: "small".into(),
        attachment: String::new(),
    };
    let receipt = app
        .scheduler
        .defer(&small, RawTaskOptions::new(), &NoTransaction)
        .await?;
    println!("deferred {}", serde_json::to_string(&receipt)?);

    let large = Greet {
        name: "large".into(),
        attachment: "#".repeat(150 * 1024),
    };
    let receipt = app
        .scheduler
        .defer(&large, RawTaskOptions::new(), &NoTransaction)
        .await?;
    println!("deferred {}", serde_json::to_string(&receipt)?);

    let tx = InMemoryTransaction::new();
    tx.begin("default");
    let in_tx = Greet {
        name: "after-commit".into(),
        attachment: String::new(),
    };
    let receipt = app.scheduler.defer(&in_tx, RawTaskOptions::new(), &tx).await?;
    println!(
        "deferred {} (queued: {})",
        serde_json::to_string(&receipt)?,
        plane.calls()
    );
    tx.commit("default").await?;

    // (D) キューに溜まった body を受信側で実行
    for created in plane.drain() {
        let result = app.runner.execute(&created.message.http_request.body).await;
        println!(
            "executed {} -> {}",
            created.message.name,
            Runner::status_code(&result)
        );
    }

    // (E) 残っている overflow レコードは sweeper が回収
    let sweeper = OverflowSweeper::new(store.clone(), clock, std::time::Duration::ZERO);
    let purged = sweeper.sweep_once().await?;
    println!("overflow records left: {} (swept {purged})", store.len());

    Ok(())
}
