//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::OverflowId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は overflow ハンドルとタスク名のランダム部分を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    /// Unique per call, never reused.
    fn generate_overflow_id(&self) -> OverflowId;

    /// Eight lowercase hex digits appended to generated task names.
    fn task_name_suffix(&self) -> String;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_overflow_id(&self) -> OverflowId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        OverflowId::from(ulid)
    }

    fn task_name_suffix(&self) -> String {
        format!("{:08x}", rand::random::<u32>())
    }
}
