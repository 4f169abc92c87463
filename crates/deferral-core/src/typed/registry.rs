//! TypedRegistry - 既知の Runnable 型の登録と管理
//!
//! Runner はこのレジストリに登録された型しか復元・実行しません。
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権

use std::collections::HashMap;
use std::sync::Arc;

use super::codec::INDIRECTION_TYPE;
use super::handler::{DynHandler, TypedHandler};
use super::runnable::Runnable;

/// TypedRegistry は型識別子 → DynHandler の対応表
///
/// # 使用例
/// ```ignore
/// let mut registry = TypedRegistry::new();
/// registry.register::<SendWelcomeMail>()?;
///
/// let handler = registry.get("acme.mail.welcome.v1");
/// ```
#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Runnable type '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Runnable type '{0}' is reserved")]
    Reserved(String),
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: Runnable>(&mut self) -> Result<(), RegistryError> {
        let task_type = T::TYPE.to_string();
        if task_type == INDIRECTION_TYPE {
            return Err(RegistryError::Reserved(task_type));
        }
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        self.handlers
            .insert(task_type, Arc::new(TypedHandler::<T>::new()));
        Ok(())
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.handlers.contains_key(task_type)
    }

    /// Sorted, for stable diagnostics.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoTask, FailingTask, ReservedTask};

    #[test]
    fn test_register_and_get() {
        let mut registry = TypedRegistry::new();
        registry.register::<EchoTask>().unwrap();

        let retrieved = registry.get(EchoTask::TYPE);
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().task_type(), EchoTask::TYPE);
        assert!(registry.get("unknown.type.v1").is_none());
    }

    #[test]
    fn test_double_registration() {
        let mut registry = TypedRegistry::new();
        registry.register::<EchoTask>().unwrap();
        let result = registry.register::<EchoTask>();
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_reserved_type_is_rejected() {
        let mut registry = TypedRegistry::new();
        let result = registry.register::<ReservedTask>();
        assert!(matches!(result, Err(RegistryError::Reserved(_))));
    }

    #[test]
    fn test_registered_types_are_sorted() {
        let mut registry = TypedRegistry::new();
        registry.register::<FailingTask>().unwrap();
        registry.register::<EchoTask>().unwrap();

        let mut expected = vec![EchoTask::TYPE.to_string(), FailingTask::TYPE.to_string()];
        expected.sort();
        assert_eq!(registry.registered_types(), expected);
    }
}
