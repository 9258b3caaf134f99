//! Task catalog: the offer wall the completion processor draws from.

use std::collections::BTreeMap;

use contracts::{TaskCategory, TaskDefinition};

#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<String, TaskDefinition>,
}

impl TaskCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock offer wall used by the demo and tests: ad views are cheap and
    /// repeatable, installs and offers are one-shot and richer.
    pub fn stock() -> Self {
        let mut catalog = Self::new();
        catalog.insert(TaskDefinition {
            task_id: "watch_ad".to_string(),
            title: "Watch a rewarded ad".to_string(),
            category: TaskCategory::AdView,
            base_reward: 10,
            daily_limit: 20,
            expiry_secs: 600,
            provider_url: Some("https://ads.example/watch".to_string()),
        });
        catalog.insert(TaskDefinition {
            task_id: "install_app".to_string(),
            title: "Install the partner app".to_string(),
            category: TaskCategory::AppInstall,
            base_reward: 25,
            daily_limit: 1,
            expiry_secs: 3_600,
            provider_url: Some("https://offers.example/install".to_string()),
        });
        catalog.insert(TaskDefinition {
            task_id: "daily_survey".to_string(),
            title: "Complete a short survey".to_string(),
            category: TaskCategory::Survey,
            base_reward: 15,
            daily_limit: 3,
            expiry_secs: 1_800,
            provider_url: Some("https://surveys.example/daily".to_string()),
        });
        catalog.insert(TaskDefinition {
            task_id: "signup_offer".to_string(),
            title: "Register with a partner site".to_string(),
            category: TaskCategory::Offer,
            base_reward: 40,
            daily_limit: 1,
            expiry_secs: 7_200,
            provider_url: Some("https://offers.example/signup".to_string()),
        });
        catalog
    }

    pub fn insert(&mut self, task: TaskDefinition) {
        self.tasks.insert(task.task_id.clone(), task);
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskDefinition> {
        self.tasks.get(task_id)
    }

    pub fn list(&self) -> Vec<TaskDefinition> {
        self.tasks.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_catalog_lists_in_stable_order() {
        let catalog = TaskCatalog::stock();
        let ids: Vec<String> = catalog
            .list()
            .into_iter()
            .map(|task| task.task_id)
            .collect();
        assert_eq!(ids, ["daily_survey", "install_app", "signup_offer", "watch_ad"]);
        assert!(catalog.get("watch_ad").is_some());
        assert!(catalog.get("unknown").is_none());
    }
}
