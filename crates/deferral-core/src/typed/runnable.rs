//! Runnable trait - 遅延実行される作業単位
//!
//! # 学習ポイント
//! - Associated Constants (`const TYPE`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::DeferError;

/// Runnable は型識別子と `run` を持つタスクペイロード
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendWelcomeMail {
///     user_id: u64,
/// }
///
/// #[async_trait]
/// impl Runnable for SendWelcomeMail {
///     const TYPE: &'static str = "acme.mail.welcome.v1";
///
///     async fn run(&self) -> Result<(), DeferError> {
///         mailer::send(self.user_id).await.map_err(|e| DeferError::transient(e.to_string()))
///     }
/// }
/// ```
///
/// # 戻り値
/// - `Ok(())`: 成功
/// - `Err(e)` で `e.is_retryable()`: キューに再配送させる
/// - それ以外の `Err`: 恒久的な失敗（再配送しない）
#[async_trait]
pub trait Runnable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 型識別子
    ///
    /// # 命名規約
    /// - `{namespace}.{domain}.{action}.v{major}`
    /// - 例: `acme.billing.charge.v1`
    const TYPE: &'static str;

    async fn run(&self) -> Result<(), DeferError>;
}
