// src/store/mod.rs
// In-memory family data backing the reference tools: tasks, calendar events,
// list items, and meal plans, all scoped per family. A production deployment
// would put a relational store behind the same tool handlers; the agent core
// never touches this module directly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTask {
    pub id: String,
    pub title: String,
    pub assigned_to: Option<String>,
    pub due: Option<String>,
    pub done: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: Option<String>,
    pub all_day: bool,
    pub recurrence: Option<Value>,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: String,
    pub list: String,
    pub name: String,
    pub checked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: String,
    pub date: String,
    pub meal: String,
    pub recipe: String,
}

#[derive(Default)]
struct FamilyData {
    tasks: Vec<FamilyTask>,
    events: Vec<CalendarEvent>,
    items: Vec<ListItem>,
    meal_plans: Vec<MealPlan>,
}

/// Per-family in-memory CRUD store.
#[derive(Default)]
pub struct FamilyStore {
    families: RwLock<HashMap<String, FamilyData>>,
}

impl FamilyStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Tasks

    pub async fn add_task(
        &self,
        family_id: &str,
        title: &str,
        assigned_to: Option<String>,
        due: Option<String>,
        created_by: &str,
    ) -> FamilyTask {
        let task = FamilyTask {
            id: new_id(),
            title: title.to_string(),
            assigned_to,
            due,
            done: false,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        let mut families = self.families.write().await;
        families
            .entry(family_id.to_string())
            .or_default()
            .tasks
            .push(task.clone());
        task
    }

    pub async fn tasks(&self, family_id: &str) -> Vec<FamilyTask> {
        let families = self.families.read().await;
        families
            .get(family_id)
            .map(|f| f.tasks.clone())
            .unwrap_or_default()
    }

    pub async fn complete_task(&self, family_id: &str, id: &str) -> Option<FamilyTask> {
        let mut families = self.families.write().await;
        let task = families
            .get_mut(family_id)?
            .tasks
            .iter_mut()
            .find(|t| t.id == id)?;
        task.done = true;
        Some(task.clone())
    }

    /// Delete by id, or by case-insensitive title when no id matches.
    pub async fn delete_task(&self, family_id: &str, id_or_title: &str) -> Option<FamilyTask> {
        let mut families = self.families.write().await;
        let tasks = &mut families.get_mut(family_id)?.tasks;
        let needle = id_or_title.to_lowercase();
        let idx = tasks
            .iter()
            .position(|t| t.id == id_or_title)
            .or_else(|| tasks.iter().position(|t| t.title.to_lowercase() == needle))?;
        Some(tasks.remove(idx))
    }

    // ── Calendar

    pub async fn add_event(
        &self,
        family_id: &str,
        title: &str,
        start: Option<String>,
        all_day: bool,
        created_by: &str,
    ) -> CalendarEvent {
        let event = CalendarEvent {
            id: new_id(),
            title: title.to_string(),
            start,
            all_day,
            recurrence: None,
            created_by: created_by.to_string(),
        };
        let mut families = self.families.write().await;
        families
            .entry(family_id.to_string())
            .or_default()
            .events
            .push(event.clone());
        event
    }

    /// Title-substring search; an empty query returns everything.
    pub async fn search_events(&self, family_id: &str, query: &str) -> Vec<CalendarEvent> {
        let needle = query.to_lowercase();
        let families = self.families.read().await;
        families
            .get(family_id)
            .map(|f| {
                f.events
                    .iter()
                    .filter(|e| needle.is_empty() || e.title.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn update_event(
        &self,
        family_id: &str,
        id: &str,
        title: Option<String>,
        start: Option<String>,
        all_day: Option<bool>,
    ) -> Option<CalendarEvent> {
        let mut families = self.families.write().await;
        let event = families
            .get_mut(family_id)?
            .events
            .iter_mut()
            .find(|e| e.id == id)?;
        if let Some(title) = title {
            event.title = title;
        }
        if start.is_some() {
            event.start = start;
        }
        if let Some(all_day) = all_day {
            event.all_day = all_day;
        }
        Some(event.clone())
    }

    pub async fn delete_event(&self, family_id: &str, id: &str) -> bool {
        let mut families = self.families.write().await;
        let Some(family) = families.get_mut(family_id) else {
            return false;
        };
        let before = family.events.len();
        family.events.retain(|e| e.id != id);
        family.events.len() < before
    }

    // ── Lists

    pub async fn add_items(&self, family_id: &str, list: &str, names: &[String]) -> Vec<ListItem> {
        let mut added = Vec::new();
        let mut families = self.families.write().await;
        let family = families.entry(family_id.to_string()).or_default();
        for name in names {
            let item = ListItem {
                id: new_id(),
                list: list.to_string(),
                name: name.clone(),
                checked: false,
            };
            family.items.push(item.clone());
            added.push(item);
        }
        added
    }

    pub async fn items(&self, family_id: &str, list: &str) -> Vec<ListItem> {
        let families = self.families.read().await;
        families
            .get(family_id)
            .map(|f| f.items.iter().filter(|i| i.list == list).cloned().collect())
            .unwrap_or_default()
    }

    pub async fn remove_item(&self, family_id: &str, list: &str, name: &str) -> bool {
        let needle = name.to_lowercase();
        let mut families = self.families.write().await;
        let Some(family) = families.get_mut(family_id) else {
            return false;
        };
        let before = family.items.len();
        family
            .items
            .retain(|i| !(i.list == list && i.name.to_lowercase() == needle));
        family.items.len() < before
    }

    // ── Meals

    pub async fn save_meal_plan(
        &self,
        family_id: &str,
        date: &str,
        meal: &str,
        recipe: &str,
    ) -> MealPlan {
        let plan = MealPlan {
            id: new_id(),
            date: date.to_string(),
            meal: meal.to_string(),
            recipe: recipe.to_string(),
        };
        let mut families = self.families.write().await;
        let family = families.entry(family_id.to_string()).or_default();
        // One plan per (date, meal) slot.
        family
            .meal_plans
            .retain(|p| !(p.date == plan.date && p.meal == plan.meal));
        family.meal_plans.push(plan.clone());
        plan
    }

    pub async fn meal_plans(&self, family_id: &str) -> Vec<MealPlan> {
        let families = self.families.read().await;
        families
            .get(family_id)
            .map(|f| f.meal_plans.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_families_are_isolated() {
        let store = FamilyStore::new();
        store.add_task("fam-a", "buy milk", None, None, "u1").await;
        assert_eq!(store.tasks("fam-a").await.len(), 1);
        assert!(store.tasks("fam-b").await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_task_by_title() {
        let store = FamilyStore::new();
        store.add_task("fam-a", "Walk the dog", None, None, "u1").await;
        let removed = store.delete_task("fam-a", "walk the dog").await;
        assert_eq!(removed.unwrap().title, "Walk the dog");
        assert!(store.tasks("fam-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_meal_plan_slot_is_replaced() {
        let store = FamilyStore::new();
        store
            .save_meal_plan("fam-a", "2026-09-01", "dinner", "tacos")
            .await;
        store
            .save_meal_plan("fam-a", "2026-09-01", "dinner", "pasta")
            .await;
        let plans = store.meal_plans("fam-a").await;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].recipe, "pasta");
    }

    #[tokio::test]
    async fn test_event_search_by_title_substring() {
        let store = FamilyStore::new();
        store
            .add_event("fam-a", "Dentist appointment", None, false, "u1")
            .await;
        store.add_event("fam-a", "Soccer practice", None, false, "u1").await;
        assert_eq!(store.search_events("fam-a", "dentist").await.len(), 1);
        assert_eq!(store.search_events("fam-a", "").await.len(), 2);
    }
}
