// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Selector
//!
//! Chooses the agents that participate in one swarm run:
//!
//! 1. Up to [`BASELINE_PER_TEMPLATE`] idle parsers and validators, always.
//! 2. Up to [`MATCHED_PER_TEMPLATE`] idle agents of each template whose keyword
//!    appears in the task text.
//! 3. Any remaining idle agents, in pool order, until `min_count` is reached.
//!
//! Never selects a working agent. Returning fewer than `min_count` is a
//! degraded-capacity condition, not an error.

use std::collections::HashSet;

use crate::domain::agent::AgentPool;
use crate::domain::task::WorkItem;
use crate::domain::template::{AgentTemplate, CATALOG};

pub const BASELINE_PER_TEMPLATE: usize = 2;
pub const MATCHED_PER_TEMPLATE: usize = 5;

/// Keyword → templates it recruits.
const KEYWORD_TRIGGERS: &[(&str, &[AgentTemplate])] = &[
    ("optimize", &[AgentTemplate::Optimizer, AgentTemplate::PerformanceAnalyzer]),
    ("test", &[AgentTemplate::Tester]),
    ("security", &[AgentTemplate::SecurityAnalyzer]),
    ("refactor", &[AgentTemplate::Refactorer, AgentTemplate::StyleChecker]),
];

/// Templates whose keywords occur in the task's scan text.
pub fn matched_templates(item: &WorkItem) -> Vec<AgentTemplate> {
    let text = item.scan_text();
    KEYWORD_TRIGGERS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .flat_map(|(_, templates)| templates.iter().copied())
        .collect()
}

/// Pick participating agents; returns pool indices in selection order.
pub fn select(pool: &AgentPool, item: &WorkItem, min_count: usize) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::new();
    let mut taken: HashSet<usize> = HashSet::new();

    for template in CATALOG.into_iter().filter(AgentTemplate::is_baseline) {
        let picks = pool.idle_of(template).take(BASELINE_PER_TEMPLATE);
        take_unique(picks, &mut taken, &mut selected);
    }

    for template in matched_templates(item) {
        let picks = pool.idle_of(template).take(MATCHED_PER_TEMPLATE);
        take_unique(picks, &mut taken, &mut selected);
    }

    if selected.len() < min_count {
        let missing = min_count - selected.len();
        let fill: Vec<usize> = pool
            .agents()
            .iter()
            .enumerate()
            .filter(|(i, a)| a.is_idle() && !taken.contains(i))
            .map(|(i, _)| i)
            .take(missing)
            .collect();
        take_unique(fill, &mut taken, &mut selected);
    }

    selected
}

fn take_unique(
    indices: impl IntoIterator<Item = usize>,
    taken: &mut HashSet<usize>,
    selected: &mut Vec<usize>,
) {
    for idx in indices {
        if taken.insert(idx) {
            selected.push(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::SubTask;

    fn templates_of(pool: &AgentPool, selected: &[usize]) -> Vec<AgentTemplate> {
        selected.iter().map(|&i| pool.get(i).unwrap().template).collect()
    }

    #[test]
    fn test_baseline_always_included() {
        let pool = AgentPool::populate(200).unwrap();
        let selected = select(&pool, &WorkItem::new("x"), 0);
        assert_eq!(
            templates_of(&pool, &selected),
            vec![
                AgentTemplate::Parser,
                AgentTemplate::Parser,
                AgentTemplate::Validator,
                AgentTemplate::Validator
            ]
        );
    }

    #[test]
    fn test_keyword_recruits_specialists() {
        let pool = AgentPool::populate(200).unwrap();
        let item = WorkItem::new("").with_description("Please optimize and refactor");
        let selected = select(&pool, &item, 0);
        let templates = templates_of(&pool, &selected);
        let count = |t| templates.iter().filter(|&&x| x == t).count();
        assert_eq!(count(AgentTemplate::Optimizer), 5);
        assert_eq!(count(AgentTemplate::PerformanceAnalyzer), 5);
        assert_eq!(count(AgentTemplate::Refactorer), 5);
        assert_eq!(count(AgentTemplate::StyleChecker), 5);
        assert_eq!(count(AgentTemplate::Tester), 0);
        assert_eq!(selected.len(), 24);
    }

    #[test]
    fn test_fill_to_min_count_without_duplicates() {
        let pool = AgentPool::populate(200).unwrap();
        let selected = select(&pool, &WorkItem::new("plain"), 10);
        assert_eq!(selected.len(), 10);
        let unique: HashSet<_> = selected.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_never_selects_working_agents() {
        let mut pool = AgentPool::populate(20).unwrap();
        for i in 0..15 {
            pool.get_mut(i)
                .unwrap()
                .begin(SubTask { code: String::new(), start_line: 0, end_line: 1 });
        }
        let selected = select(&pool, &WorkItem::new("security test"), 50);
        assert_eq!(selected.len(), 5);
        assert!(selected.iter().all(|&i| pool.get(i).unwrap().is_idle()));
    }

    #[test]
    fn test_small_pool_degrades() {
        let pool = AgentPool::populate(2).unwrap();
        let selected = select(&pool, &WorkItem::new("a\nb\nc\nd"), 2);
        assert_eq!(selected, vec![0, 1]);
    }

    #[test]
    fn test_matched_templates_scans_code_without_description() {
        let item = WorkItem::new("// TODO: add a security test");
        let matched = matched_templates(&item);
        assert!(matched.contains(&AgentTemplate::Tester));
        assert!(matched.contains(&AgentTemplate::SecurityAnalyzer));
        assert!(!matched.contains(&AgentTemplate::Optimizer));
    }
}
